use std::error::Error;

use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes::BytesMut;

use crate::types::RowValues;

/// Encodes by the server's declared parameter type: an `Int` bound to an `int4` column is
/// sent as four bytes, a value the type cannot hold is an error.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            RowValues::Text(s) => match *ty {
                Type::NUMERIC => s.parse::<Decimal>()?.to_sql(ty, out),
                _ => s.to_sql_checked(ty, out),
            },
            RowValues::Bool(b) => b.to_sql_checked(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => dt.to_sql_checked(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql_checked(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql_checked(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_narrow_to_the_declared_width() {
        let mut out = BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(out.as_ref(), &7i32.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(RowValues::Int(70_000).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn numbers_bind_to_numeric() {
        use tokio_postgres::types::FromSql;

        let mut out = BytesMut::new();
        RowValues::Float(9.5).to_sql(&Type::NUMERIC, &mut out).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &out).unwrap(), Decimal::new(95, 1));

        let mut out = BytesMut::new();
        RowValues::Int(42).to_sql(&Type::NUMERIC, &mut out).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &out).unwrap(), Decimal::from(42));

        let mut out = BytesMut::new();
        assert!(RowValues::from("12.x").to_sql(&Type::NUMERIC, &mut out).is_err());
    }

    #[test]
    fn null_is_sent_as_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            RowValues::Null.to_sql(&Type::TEXT, &mut out).unwrap(),
            IsNull::Yes
        ));
    }
}
