use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// Declared storage type of a bulk-load column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    Float,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// In-memory table used for bulk loads and table-valued procedure calls.
///
/// ```rust
/// use sql_bridge::driver::{ColumnKind, TableData};
/// use sql_bridge::RowValues;
///
/// let mut table = TableData::new("scores")
///     .column("player", ColumnKind::Int)
///     .column("points", ColumnKind::Float);
/// table.push_row(vec![RowValues::Int(1), RowValues::Float(9.5)]).unwrap();
/// assert_eq!(table.rows.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<RowValues>>,
}

impl TableData {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(TableColumn {
            name: name.into(),
            kind,
        });
        self
    }

    /// Append a row; values must follow column order.
    ///
    /// # Errors
    /// `ParameterError` if the row width differs from the column count.
    pub fn push_row(&mut self, row: Vec<RowValues>) -> Result<(), SqlBridgeError> {
        if row.len() != self.columns.len() {
            return Err(SqlBridgeError::ParameterError(format!(
                "row has {} values but table {} has {} columns",
                row.len(),
                self.name,
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Check every row against the column count; `rows` is public, so rows may
    /// bypass [`push_row`](Self::push_row).
    ///
    /// # Errors
    /// `ParameterError` naming the first row with the wrong width.
    pub fn validate(&self) -> Result<(), SqlBridgeError> {
        match self
            .rows
            .iter()
            .position(|row| row.len() != self.columns.len())
        {
            Some(idx) => Err(SqlBridgeError::ParameterError(format!(
                "row {idx} of table {} has {} values, expected {}",
                self.name,
                self.rows[idx].len(),
                self.columns.len()
            ))),
            None => Ok(()),
        }
    }

    /// Comma-separated column names.
    #[must_use]
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Ordinal of `name`, ignoring ASCII case.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
