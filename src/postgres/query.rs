use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// `NUMERIC` goes through [`Decimal`]; other text-like types are read as strings.
///
/// # Errors
/// Returns `SqlBridgeError::PostgresError` if the column cannot be decoded and
/// `SqlBridgeError::MappingError` for a type with no `RowValues` counterpart.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlBridgeError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(RowValues::from),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx)?.map(numeric_value),
        ref other if <String as FromSql>::accepts(other) => {
            row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text)
        }
        ref other => {
            return Err(SqlBridgeError::MappingError(format!(
                "column {} has unsupported type {other}",
                row.columns()[idx].name()
            )));
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Whole numbers that fit in `i64` (such as `sum(int8)`) stay integers, the rest become
/// floats.
fn numeric_value(value: Decimal) -> RowValues {
    if value.fract().is_zero()
        && let Some(int) = value.to_i64()
    {
        return RowValues::Int(int);
    }
    value
        .to_f64()
        .map_or_else(|| RowValues::Text(value.to_string()), RowValues::Float)
}

/// Every column of `row`, in ordinal order.
///
/// # Errors
/// See [`postgres_extract_value`].
pub fn extract_row(row: &Row) -> Result<Vec<RowValues>, SqlBridgeError> {
    (0..row.len()).map(|idx| postgres_extract_value(row, idx)).collect()
}

/// Build a result set using statement metadata for column names, so an empty result
/// still reports its columns.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    columns: &[tokio_postgres::Column],
    rows: &[Row],
) -> Result<ResultSet, SqlBridgeError> {
    let column_names: Vec<String> = columns.iter().map(|col| col.name().to_string()).collect();
    let mut result_set = ResultSet::with_columns(column_names, rows.len());
    for row in rows {
        result_set.add_row_values(extract_row(row)?);
    }
    Ok(result_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numerics_stay_integers() {
        assert_eq!(numeric_value(Decimal::from(3)), RowValues::Int(3));
        assert_eq!(numeric_value(Decimal::new(20, 1)), RowValues::Int(2));
    }

    #[test]
    fn fractional_numerics_become_floats() {
        assert_eq!(numeric_value(Decimal::new(15, 1)), RowValues::Float(1.5));
        assert_eq!(numeric_value(Decimal::new(-925, 2)), RowValues::Float(-9.25));
    }
}
