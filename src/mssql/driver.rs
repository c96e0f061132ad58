use async_trait::async_trait;

use super::bulk;
use super::config::{connect, parse_dsn};
use super::connection::MssqlConnection;
use crate::db::Db;
use crate::dialect::{self, Dialect, MsDialect};
use crate::dialect::mssql::prefixed_name;
use crate::driver::{Driver, Param, TableData};
use crate::error::SqlBridgeError;
use crate::query_builder::QueryBuilder;
use crate::types::RowValues;

/// Server error numbers that must never be downgraded: login failed, permission denied.
const FATAL_SERVER_ERRORS: [u32; 2] = [18456, 229];

fn is_fatal_server_code(code: u32) -> bool {
    FATAL_SERVER_ERRORS.contains(&code)
}

/// SQL Server driver.
///
/// Connection strings use the ADO.NET format:
///
/// ```rust,no_run
/// use sql_bridge::prelude::*;
///
/// # async fn demo() -> Result<(), SqlBridgeError> {
/// let db = Db::new(
///     MssqlDriver,
///     "server=tcp:localhost,1433;database=shop;user id=app;password=pw;TrustServerCertificate=true",
/// );
/// let ret = db.sp_execute("dbo.archive_orders", record! { days: 30 }).await?;
/// # let _ = ret;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDriver;

impl Dialect for MssqlDriver {
    fn name(&self) -> &'static str {
        MsDialect.name()
    }

    fn parameter_name(&self, builder: &QueryBuilder<'_>, column: &str) -> String {
        MsDialect.parameter_name(builder, column)
    }

    fn pagination_prefix(&self, builder: &QueryBuilder<'_>, sql: String) -> String {
        MsDialect.pagination_prefix(builder, sql)
    }

    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, sql: String) -> String {
        MsDialect.pagination_suffix(builder, sql)
    }
}

#[async_trait]
impl Driver for MssqlDriver {
    type Connection = MssqlConnection;

    async fn open_connection(&self, dsn: &str) -> Result<MssqlConnection, SqlBridgeError> {
        let config = parse_dsn(dsn)?;
        Ok(MssqlConnection::new(connect(config).await?))
    }

    fn create_parameter(&self, name: &str, value: RowValues) -> Param {
        Param::named(prefixed_name(name), value)
    }

    fn create_return_parameter(&self) -> Param {
        Param::return_value("@returnValue")
    }

    fn supports_table_valued_parameter(&self) -> bool {
        true
    }

    async fn bulk_insert(
        &self,
        conn: &mut MssqlConnection,
        table: &TableData,
    ) -> Result<u64, SqlBridgeError> {
        bulk::bulk_load(conn, table).await
    }

    async fn table_valued_call(
        &self,
        conn: &mut MssqlConnection,
        procedure: &str,
        table: &TableData,
    ) -> Result<i32, SqlBridgeError> {
        bulk::table_valued_call(conn, procedure, table).await
    }

    async fn table_exists(&self, db: &Db<Self>, table: &str) -> Result<bool, SqlBridgeError> {
        dialect::mssql::table_exists(db, table).await
    }

    async fn create_table(
        &self,
        db: &Db<Self>,
        table: &str,
        definitions: &[&str],
        if_not_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::mssql::create_table(db, table, definitions, if_not_exists).await
    }

    async fn drop_table(
        &self,
        db: &Db<Self>,
        table: &str,
        if_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::mssql::drop_table(db, table, if_exists).await
    }

    async fn truncate_table(
        &self,
        db: &Db<Self>,
        table: &str,
        reset_identity: bool,
    ) -> Result<bool, SqlBridgeError> {
        dialect::mssql::truncate_table(db, table, reset_identity).await
    }

    fn is_fatal_error(&self, error: &SqlBridgeError) -> bool {
        if error.is_connection_failure() {
            return true;
        }
        match error.root_cause() {
            SqlBridgeError::MssqlError(tiberius::error::Error::Server(token)) => {
                is_fatal_server_code(token.code())
            }
            _ => false,
        }
    }
}
