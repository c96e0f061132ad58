use async_trait::async_trait;
use tokio_postgres::error::SqlState;

use super::bulk;
use super::config::{connect, parse_dsn};
use super::connection::PgConnection;
use crate::db::Db;
use crate::dialect::{self, Dialect, PgDialect};
use crate::driver::{Driver, Param, TableData};
use crate::error::SqlBridgeError;
use crate::query_builder::QueryBuilder;
use crate::types::RowValues;

/// `PostgreSQL` driver.
///
/// ```rust,no_run
/// use sql_bridge::prelude::*;
///
/// # async fn demo() -> Result<(), SqlBridgeError> {
/// let db = Db::new(PgDriver, "host=localhost user=app dbname=shop");
/// let active = db
///     .find("users", record! { active: true }, QueryOptions::default().limit(10))
///     .await?;
/// # let _ = active;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDriver;

impl Dialect for PgDriver {
    fn name(&self) -> &'static str {
        PgDialect.name()
    }

    fn parameter_name(&self, builder: &QueryBuilder<'_>, column: &str) -> String {
        PgDialect.parameter_name(builder, column)
    }

    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, sql: String) -> String {
        PgDialect.pagination_suffix(builder, sql)
    }
}

#[async_trait]
impl Driver for PgDriver {
    type Connection = PgConnection;

    async fn open_connection(&self, dsn: &str) -> Result<PgConnection, SqlBridgeError> {
        let config = parse_dsn(dsn)?;
        let (client, task) = connect(&config).await?;
        Ok(PgConnection::new(client, task))
    }

    /// Binding is positional; the name is kept for diagnostics and named-text translation.
    fn create_parameter(&self, name: &str, value: RowValues) -> Param {
        Param::named(name, value)
    }

    async fn bulk_insert(
        &self,
        conn: &mut PgConnection,
        table: &TableData,
    ) -> Result<u64, SqlBridgeError> {
        bulk::copy_in(conn, table).await
    }

    async fn table_exists(&self, db: &Db<Self>, table: &str) -> Result<bool, SqlBridgeError> {
        dialect::postgres::table_exists(db, table).await
    }

    async fn create_table(
        &self,
        db: &Db<Self>,
        table: &str,
        definitions: &[&str],
        if_not_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::postgres::create_table(db, table, definitions, if_not_exists).await
    }

    async fn drop_table(
        &self,
        db: &Db<Self>,
        table: &str,
        if_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::postgres::drop_table(db, table, if_exists).await
    }

    async fn truncate_table(
        &self,
        db: &Db<Self>,
        table: &str,
        reset_identity: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::postgres::truncate_table(db, table, reset_identity).await
    }

    /// Connection failures, bad passwords (28P01) and missing privileges (42501).
    fn is_fatal_error(&self, error: &SqlBridgeError) -> bool {
        if error.is_connection_failure() {
            return true;
        }
        match error.root_cause() {
            SqlBridgeError::PostgresError(e) => matches!(
                e.code(),
                Some(code) if *code == SqlState::INVALID_PASSWORD
                    || *code == SqlState::INSUFFICIENT_PRIVILEGE
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_numbered_placeholders() {
        let driver = PgDriver;
        let stmt = QueryBuilder::new(&driver)
            .find(
                "users",
                crate::record! { active: true },
                crate::query_builder::QueryOptions::default().limit(10),
            )
            .statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE active = $1 LIMIT 10");
        assert_eq!(stmt.params, vec![("$1".to_string(), RowValues::Bool(true))]);
    }

    #[test]
    fn plain_statement_failures_are_not_fatal() {
        let driver = PgDriver;
        let err = SqlBridgeError::execution("SELEC 1", SqlBridgeError::Other("syntax".into()));
        assert!(!driver.is_fatal_error(&err));
        let err = SqlBridgeError::execution("SELECT 1", SqlBridgeError::connection("refused"));
        assert!(driver.is_fatal_error(&err));
    }

    #[tokio::test]
    async fn malformed_dsn_fails_before_connecting() {
        let err = PgDriver
            .open_connection("port=notanumber")
            .await
            .unwrap_err();
        assert!(err.is_connection_failure());
    }
}
