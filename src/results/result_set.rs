use std::collections::HashMap;
use std::sync::Arc;

use super::row::{column_index, CustomDbRow};
use crate::types::RowValues;

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    column_names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Empty result with the given columns and room for `capacity` rows.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> ResultSet {
        let index = Arc::new(column_index(&column_names));
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            index,
        }
    }

    /// Column names shared by every row.
    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Append a row. Values must be in column order.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.results.push(CustomDbRow::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.index),
            row_values,
        ));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// First column of the first row, `Null` when there is no row.
    #[must_use]
    pub fn first_value(&self) -> RowValues {
        self.results
            .first()
            .and_then(|row| row.get_by_index(0))
            .cloned()
            .unwrap_or(RowValues::Null)
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<CustomDbRow> {
        self.results
    }
}

impl IntoIterator for ResultSet {
    type Item = CustomDbRow;
    type IntoIter = std::vec::IntoIter<CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_metadata() {
        let mut rs = ResultSet::with_columns(vec!["c".into()], 2);
        assert_eq!(rs.first_value(), RowValues::Null);
        rs.add_row_values(vec![RowValues::Int(3)]);
        rs.add_row_values(vec![RowValues::Int(4)]);
        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(&rs.results[0].column_names, &rs.results[1].column_names));
        assert_eq!(rs.first_value(), RowValues::Int(3));
    }
}
