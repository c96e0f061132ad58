use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryStream, Row};

use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Convert one SQL Server cell.
///
/// # Errors
/// Returns `SqlBridgeError::MappingError` for types without a mapping (`xml`, `sql_variant`
/// payloads) and client errors for undecodable temporals.
pub fn extract_value(data: ColumnData<'static>) -> Result<RowValues, SqlBridgeError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.map(|s| RowValues::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| RowValues::Blob(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| {
            #[allow(clippy::cast_precision_loss)]
            let value = n.value() as f64 / 10f64.powi(i32::from(n.scale()));
            RowValues::Float(value)
        }),
        data @ (ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_)) => {
            NaiveDateTime::from_sql(&data)?.map(RowValues::Timestamp)
        }
        data @ ColumnData::Date(_) => NaiveDate::from_sql(&data)?.map(RowValues::from),
        data @ ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(&data)?.map(|v| RowValues::Timestamp(v.naive_utc()))
        }
        data @ ColumnData::Time(_) => NaiveTime::from_sql(&data)?.map(|t| RowValues::Text(t.to_string())),
        other => {
            return Err(SqlBridgeError::MappingError(format!(
                "unsupported SQL Server value {other:?}"
            )));
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Every column of `row`, in ordinal order.
///
/// # Errors
/// See [`extract_value`].
pub fn extract_row(row: Row) -> Result<Vec<RowValues>, SqlBridgeError> {
    row.into_iter().map(extract_value).collect()
}

/// Materialize the first result of `stream`.
///
/// A batch that returns no result reports no columns and no rows.
///
/// # Errors
/// Returns client errors raised while fetching.
pub async fn build_result_set(mut stream: QueryStream<'_>) -> Result<ResultSet, SqlBridgeError> {
    let column_names: Vec<String> = stream
        .columns()
        .await?
        .map(|cols| cols.iter().map(|col| col.name().to_string()).collect())
        .unwrap_or_default();

    let mut result_set = ResultSet::with_columns(column_names, 0);
    let mut rows = stream.into_row_stream();
    while let Some(row) = rows.try_next().await? {
        result_set.add_row_values(extract_row(row)?);
    }
    Ok(result_set)
}

/// First column of the first row of the last result in `stream`.
///
/// # Errors
/// Returns client errors raised while fetching.
pub async fn last_result_value(stream: QueryStream<'_>) -> Result<RowValues, SqlBridgeError> {
    let results = stream.into_results().await?;
    match results
        .into_iter()
        .rev()
        .find(|rows| !rows.is_empty())
        .and_then(|rows| rows.into_iter().next())
        .and_then(|row| row.into_iter().next())
    {
        Some(data) => extract_value(data),
        None => Ok(RowValues::Null),
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn cells_map_to_row_values() {
        assert_eq!(extract_value(ColumnData::I32(Some(7))).unwrap(), RowValues::Int(7));
        assert_eq!(extract_value(ColumnData::I64(None)).unwrap(), RowValues::Null);
        assert_eq!(
            extract_value(ColumnData::String(Some(Cow::Borrowed("Ann")))).unwrap(),
            RowValues::Text("Ann".into())
        );
        assert_eq!(extract_value(ColumnData::Bit(Some(true))).unwrap(), RowValues::Bool(true));
    }

    #[test]
    fn numerics_keep_their_scale() {
        let value = extract_value(ColumnData::Numeric(Some(tiberius::numeric::Numeric::new_with_scale(
            12345, 2,
        ))))
        .unwrap();
        assert_eq!(value, RowValues::Float(123.45));
    }
}
