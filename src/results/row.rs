use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SqlBridgeError;
use crate::types::{FromRowValue, RowValues};

/// A row from a materialized result.
///
/// Column names and the name index are shared with every other row of the same
/// [`ResultSet`](super::ResultSet). Duplicate column names are allowed; lookup by name
/// resolves to the later column.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// Cell values in column order
    pub rows: Vec<RowValues>,
    index: Arc<HashMap<String, usize>>,
}

/// Name to ordinal map; later duplicates overwrite earlier ones.
pub(crate) fn column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

impl CustomDbRow {
    /// Create a standalone row that owns its own name index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let index = Arc::new(column_index(&column_names));
        Self {
            column_names,
            rows,
            index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        index: Arc<HashMap<String, usize>>,
        rows: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            rows,
            index,
        }
    }

    /// Ordinal of `column_name`, if present.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.index.get(column_name).copied()
    }

    /// Value of the named column.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Typed value of the named column.
    ///
    /// # Errors
    /// `MappingError` if the column is missing or its value does not convert to `T`.
    pub fn try_get<T: FromRowValue>(&self, column_name: &str) -> Result<T, SqlBridgeError> {
        let value = self.get(column_name).ok_or_else(|| {
            SqlBridgeError::MappingError(format!("no column named {column_name}"))
        })?;
        T::from_row_value(value.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the row, returning cell values in column order.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.rows
    }
}
