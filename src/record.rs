//! Normalization of record-like values into ordered `(name, value)` pairs.
//!
//! Statements built from records (inserts, updates, equality filters, stored-procedure
//! arguments) all go through [`Record::into_pairs`], so the field order a caller wrote is
//! the order columns and placeholders appear in the generated SQL.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// A record-like value.
///
/// Typed records (any `Serialize` struct) are converted once at the boundary with
/// [`Record::from_serialize`] and end up as [`Record::Map`] in declared field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Record {
    /// No fields.
    #[default]
    Null,
    /// Ordered key/value list.
    Pairs(Vec<(String, RowValues)>),
    /// Name-keyed map, iterated in insertion order.
    Map(Map<String, JsonValue>),
}

impl Record {
    /// Convert any serializable value into a record.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ParameterError` if `value` does not serialize to an object
    /// or null.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, SqlBridgeError> {
        let json = serde_json::to_value(value)
            .map_err(|e| SqlBridgeError::ParameterError(format!("record serialization failed: {e}")))?;
        match json {
            JsonValue::Null => Ok(Record::Null),
            JsonValue::Object(map) => Ok(Record::Map(map)),
            other => Err(SqlBridgeError::ParameterError(format!(
                "expected a record with named fields, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Record::Null => true,
            Record::Pairs(pairs) => pairs.is_empty(),
            Record::Map(map) => map.is_empty(),
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Record::Null => 0,
            Record::Pairs(pairs) => pairs.len(),
            Record::Map(map) => map.len(),
        }
    }

    /// Consume the record and return its fields in order.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, RowValues)> {
        match self {
            Record::Null => Vec::new(),
            Record::Pairs(pairs) => pairs,
            Record::Map(map) => map
                .into_iter()
                .map(|(name, value)| (name, RowValues::from(value)))
                .collect(),
        }
    }

    /// Borrowing variant of [`Record::into_pairs`].
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, RowValues)> {
        self.clone().into_pairs()
    }

    /// Field names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        match self {
            Record::Null => Vec::new(),
            Record::Pairs(pairs) => pairs.iter().map(|(name, _)| name.clone()).collect(),
            Record::Map(map) => map.keys().cloned().collect(),
        }
    }
}

impl From<Vec<(String, RowValues)>> for Record {
    fn from(pairs: Vec<(String, RowValues)>) -> Self {
        Record::Pairs(pairs)
    }
}

impl From<Vec<(&str, RowValues)>> for Record {
    fn from(pairs: Vec<(&str, RowValues)>) -> Self {
        Record::Pairs(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

impl From<Map<String, JsonValue>> for Record {
    fn from(map: Map<String, JsonValue>) -> Self {
        Record::Map(map)
    }
}

/// Build a [`Record`] from `name: value` or `"name" => value` entries.
///
/// ```rust
/// use sql_bridge::record;
///
/// let user = record! { name: "Ann", age: 30 };
/// assert_eq!(user.names(), vec!["name", "age"]);
///
/// let quoted = record! { "order" => 1 };
/// assert_eq!(quoted.len(), 1);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::Pairs(::std::vec::Vec::new())
    };
    ($($name:ident : $value:expr),+ $(,)?) => {
        $crate::Record::Pairs(::std::vec![
            $((::std::string::String::from(stringify!($name)), $crate::RowValues::from($value))),+
        ])
    };
    ($($name:literal => $value:expr),+ $(,)?) => {
        $crate::Record::Pairs(::std::vec![
            $((::std::string::String::from($name), $crate::RowValues::from($value))),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct User {
        name: String,
        age: i32,
        email: Option<String>,
    }

    #[test]
    fn null_record_has_no_pairs() {
        assert!(Record::Null.into_pairs().is_empty());
        assert!(Record::from_serialize(&()).unwrap().is_empty());
    }

    #[test]
    fn typed_record_keeps_declared_order_and_nulls() {
        let user = User {
            name: "Ann".into(),
            age: 30,
            email: None,
        };
        let pairs = Record::from_serialize(&user).unwrap().into_pairs();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), RowValues::Text("Ann".into())),
                ("age".to_string(), RowValues::Int(30)),
                ("email".to_string(), RowValues::Null),
            ]
        );
    }

    #[test]
    fn maps_iterate_in_insertion_order() {
        let value = json!({ "zeta": 1, "alpha": "a", "tags": ["x"] });
        let JsonValue::Object(map) = value else {
            panic!("object expected");
        };
        let pairs = Record::from(map).into_pairs();
        let names: Vec<_> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "tags"]);
        assert_eq!(pairs[2].1, RowValues::JSON(json!(["x"])));
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert!(matches!(
            Record::from_serialize(&42),
            Err(SqlBridgeError::ParameterError(_))
        ));
    }

    #[test]
    fn macro_builds_ordered_pairs() {
        let rec = crate::record! { name: "Ann", age: 30, active: true };
        assert_eq!(
            rec.to_pairs(),
            vec![
                ("name".to_string(), RowValues::Text("Ann".into())),
                ("age".to_string(), RowValues::Int(30)),
                ("active".to_string(), RowValues::Bool(true)),
            ]
        );
        let rec = crate::record! { "select" => None::<i64> };
        assert_eq!(rec.to_pairs(), vec![("select".to_string(), RowValues::Null)]);
    }
}
