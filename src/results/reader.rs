use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{BoxStream, Stream, StreamExt};

use super::result_set::ResultSet;
use super::row::{column_index, CustomDbRow};
use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// Forward-only row cursor that owns the connection it reads from.
///
/// Dropping or [closing](RowReader::close) the reader releases the connection.
pub struct RowReader {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    rows: BoxStream<'static, Result<Vec<RowValues>, SqlBridgeError>>,
    // Dropped after `rows`; keeps the connection alive while the stream is read.
    _owner: Option<Box<dyn Send>>,
}

impl std::fmt::Debug for RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl RowReader {
    /// Build a reader over `rows`, keeping `owner` alive until the reader is dropped.
    pub fn new(
        columns: Vec<String>,
        rows: BoxStream<'static, Result<Vec<RowValues>, SqlBridgeError>>,
        owner: Option<Box<dyn Send>>,
    ) -> Self {
        let index = Arc::new(column_index(&columns));
        Self {
            columns: Arc::new(columns),
            index,
            rows,
            _owner: owner,
        }
    }

    /// Number of columns in every row.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.columns
    }

    fn shape(&self, mut values: Vec<RowValues>) -> Result<CustomDbRow, SqlBridgeError> {
        let field_count = self.field_count();
        if values.len() < field_count {
            return Err(SqlBridgeError::MappingError(format!(
                "row has {} values, expected {field_count}",
                values.len()
            )));
        }
        values.truncate(field_count);
        Ok(CustomDbRow::with_index(
            Arc::clone(&self.columns),
            Arc::clone(&self.index),
            values,
        ))
    }

    /// Next row, or `None` once the result is exhausted.
    ///
    /// # Errors
    /// Propagates driver errors raised while fetching.
    pub async fn next_row(&mut self) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        match self.rows.next().await {
            Some(values) => self.shape(values?).map(Some),
            None => Ok(None),
        }
    }

    /// Drain every remaining row; the reader and its connection stay alive.
    ///
    /// # Errors
    /// Propagates driver errors raised while fetching.
    pub async fn read_remaining(&mut self) -> Result<ResultSet, SqlBridgeError> {
        let mut result = ResultSet::with_columns(self.columns.as_ref().clone(), 0);
        while let Some(row) = self.next_row().await? {
            result.add_row_values(row.into_values());
        }
        Ok(result)
    }

    /// Drain every remaining row, then release the connection.
    ///
    /// # Errors
    /// Propagates driver errors raised while fetching.
    pub async fn read_all(mut self) -> Result<ResultSet, SqlBridgeError> {
        let result = self.read_remaining().await?;
        self.close();
        Ok(result)
    }

    /// Release the underlying connection without reading further rows.
    pub fn close(self) {
        drop(self);
    }
}

impl Stream for RowReader {
    type Item = Result<CustomDbRow, SqlBridgeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.rows.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(values))) => Poll::Ready(Some(this.shape(values))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn next_row_copies_field_count_columns() {
        let rows = stream::iter(vec![
            Ok(vec![RowValues::Int(1), RowValues::from("a"), RowValues::Null]),
            Ok(vec![RowValues::Int(2), RowValues::from("b")]),
        ])
        .boxed();
        let mut reader = RowReader::new(vec!["id".into(), "name".into()], rows, None);
        assert_eq!(reader.field_count(), 2);
        let first = reader.next_row().await.unwrap().unwrap();
        assert_eq!(first.rows, vec![RowValues::Int(1), RowValues::from("a")]);
        let rest = reader.read_all().await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest.results[0].get("name"), Some(&RowValues::from("b")));
    }

    #[tokio::test]
    async fn short_rows_are_rejected() {
        let rows = stream::iter(vec![Ok(vec![RowValues::Int(1)])]).boxed();
        let mut reader = RowReader::new(vec!["a".into(), "b".into()], rows, None);
        assert!(matches!(
            reader.next_row().await,
            Err(SqlBridgeError::MappingError(_))
        ));
    }
}
