use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlBridgeError;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used by every dialect, so callers never touch driver types:
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::from("alice"),
///     RowValues::from(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short type label used in mapping errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "int",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "bool",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "null",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<i16> for RowValues {
    fn from(value: i16) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<u32> for RowValues {
    fn from(value: u32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<f32> for RowValues {
    fn from(value: f32) -> Self {
        RowValues::Float(f64::from(value))
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<NaiveDate> for RowValues {
    fn from(value: NaiveDate) -> Self {
        RowValues::Timestamp(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<JsonValue> for RowValues {
    /// Scalars become their native variant; arrays and objects stay JSON.
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s),
            other => RowValues::JSON(other),
        }
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Conversion of a returned value into the caller's requested type.
///
/// Incompatible values fail with [`SqlBridgeError::MappingError`]; only lossless widening
/// is attempted.
pub trait FromRowValue: Sized {
    /// # Errors
    /// Returns `SqlBridgeError::MappingError` when `value` cannot represent `Self`.
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError>;
}

fn mismatch(value: &RowValues, target: &str) -> SqlBridgeError {
    SqlBridgeError::MappingError(format!("cannot convert {} value to {target}", value.kind()))
}

impl FromRowValue for RowValues {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        Ok(value)
    }
}

impl FromRowValue for i64 {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        match value {
            RowValues::Int(i) => Ok(i),
            other => Err(mismatch(&other, "i64")),
        }
    }
}

impl FromRowValue for i32 {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        match value {
            RowValues::Int(i) => i32::try_from(i).map_err(|e| {
                SqlBridgeError::MappingError(format!("integer {i} out of range for i32: {e}"))
            }),
            other => Err(mismatch(&other, "i32")),
        }
    }
}

impl FromRowValue for f64 {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        value.as_float().ok_or_else(|| mismatch(&value, "f64"))
    }
}

impl FromRowValue for bool {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        value.as_bool().copied().ok_or_else(|| mismatch(&value, "bool"))
    }
}

impl FromRowValue for String {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        match value {
            RowValues::Text(s) => Ok(s),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl FromRowValue for NaiveDateTime {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        value
            .as_timestamp()
            .ok_or_else(|| mismatch(&value, "NaiveDateTime"))
    }
}

impl FromRowValue for JsonValue {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        match value {
            RowValues::JSON(v) => Ok(v),
            RowValues::Text(s) => serde_json::from_str(&s)
                .map_err(|e| SqlBridgeError::MappingError(format!("text is not JSON: {e}"))),
            other => Err(mismatch(&other, "JSON")),
        }
    }
}

impl FromRowValue for Vec<u8> {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        match value {
            RowValues::Blob(bytes) => Ok(bytes),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    fn from_row_value(value: RowValues) -> Result<Self, SqlBridgeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_row_value(value).map(Some)
        }
    }
}

/// The dialects this crate can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL`
    Postgres,
    /// SQL Server
    Mssql,
}
