use super::Db;
use crate::driver::{Connection, Driver, TableData};
use crate::error::SqlBridgeError;
use crate::query_builder::{Filter, QueryOptions};
use crate::record::Record;
use crate::results::{CustomDbRow, ResultSet, RowReader};

/// Finders, record writes and table-level operations.
impl<D: Driver> Db<D> {
    /// Streaming reader over `SELECT ... FROM table WHERE filter`.
    ///
    /// # Errors
    /// See [`Db::run`].
    pub async fn read(
        &self,
        table: &str,
        filter: impl Into<Filter>,
        options: QueryOptions,
    ) -> Result<RowReader, SqlBridgeError> {
        self.statement_reader(self.qb().find(table, filter, options))
            .await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn find(
        &self,
        table: &str,
        filter: impl Into<Filter>,
        options: QueryOptions,
    ) -> Result<ResultSet, SqlBridgeError> {
        self.statement_result(self.qb().find(table, filter, options))
            .await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn first(
        &self,
        table: &str,
        filter: impl Into<Filter>,
        options: QueryOptions,
    ) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        self.statement_first(self.qb().first(table, filter, options))
            .await
    }

    /// `count(*)` of matching rows; 0 when the query yields no row.
    ///
    /// # Errors
    /// See [`Db::run`]; `MappingError` if the count is not an integer.
    pub async fn count(
        &self,
        table: &str,
        filter: impl Into<Filter>,
        options: QueryOptions,
    ) -> Result<i64, SqlBridgeError> {
        let qb = self
            .qb()
            .find(table, filter, options)
            .select(&["count(*) AS c"]);
        match self.statement_first(qb).await? {
            Some(row) => Ok(row.try_get::<Option<i64>>("c")?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn insert(&self, table: &str, record: Record) -> Result<i64, SqlBridgeError> {
        self.statement_execute(self.qb().insert(table, record)).await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn update(
        &self,
        table: &str,
        record: Record,
        filter: impl Into<Filter>,
    ) -> Result<i64, SqlBridgeError> {
        self.statement_execute(self.qb().update(table, record, filter))
            .await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn delete(&self, table: &str, filter: impl Into<Filter>) -> Result<i64, SqlBridgeError> {
        self.statement_execute(self.qb().delete(table, filter)).await
    }

    /// Bulk-load every row of `table` in one transaction.
    ///
    /// # Errors
    /// `ParameterError` for a row whose width differs from the columns, otherwise
    /// connection and load failures; nothing is committed on error.
    pub async fn bulk_insert(&self, table: &TableData) -> Result<u64, SqlBridgeError> {
        tracing::info!(
            dialect = self.driver().name(),
            table = %table.name,
            columns = table.columns.len(),
            rows = table.rows.len(),
            "bulk insert"
        );
        table.validate()?;
        let mut conn = self.connect().await?;
        let written = self.driver().bulk_insert(&mut conn, table).await?;
        conn.close().await?;
        Ok(written)
    }

    /// Pass `table` to `procedure` as a table-valued parameter.
    ///
    /// # Errors
    /// `UnsupportedOperation` when the dialect has no table-valued parameters, and
    /// `ParameterError` for a row whose width differs from the columns.
    pub async fn insert_via_procedure(
        &self,
        procedure: &str,
        table: &TableData,
    ) -> Result<i64, SqlBridgeError> {
        if !self.driver().supports_table_valued_parameter() {
            return Err(SqlBridgeError::UnsupportedOperation(format!(
                "{} has no table-valued parameters",
                self.driver().name()
            )));
        }
        tracing::info!(
            dialect = self.driver().name(),
            procedure,
            table = %table.name,
            rows = table.rows.len(),
            "table-valued procedure call"
        );
        table.validate()?;
        let mut conn = self.connect().await?;
        let ret = self
            .driver()
            .table_valued_call(&mut conn, procedure, table)
            .await?;
        conn.close().await?;
        Ok(i64::from(ret))
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn exists(&self, table: &str) -> Result<bool, SqlBridgeError> {
        self.driver().table_exists(self, table).await
    }

    /// `CREATE TABLE`; `definitions` as for [`table_definitions`](crate::dialect::table_definitions).
    ///
    /// # Errors
    /// Only fatal failures; others yield `Ok(false)`.
    pub async fn create(
        &self,
        table: &str,
        definitions: &[&str],
        if_not_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        self.driver()
            .create_table(self, table, definitions, if_not_exists)
            .await
    }

    /// # Errors
    /// Only fatal failures; others yield `Ok(false)`.
    pub async fn drop(&self, table: &str, if_exists: bool) -> Result<bool, SqlBridgeError> {
        self.driver().drop_table(self, table, if_exists).await
    }

    /// # Errors
    /// `UnsupportedOperation` when identity reset is unavailable, otherwise only fatal
    /// failures.
    pub async fn truncate(&self, table: &str, reset_identity: bool) -> Result<bool, SqlBridgeError> {
        self.driver()
            .truncate_table(self, table, reset_identity)
            .await
    }
}
