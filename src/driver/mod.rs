//! Driver contract: everything the engine needs from a database client.

mod command;
mod table;

pub use command::{Command, CommandKind, Param, ParamDirection, Params};
pub use table::{ColumnKind, TableColumn, TableData};

use async_trait::async_trait;

use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::SqlBridgeError;
use crate::results::{ResultSet, RowReader};
use crate::types::RowValues;

/// Outcome of a non-query command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Executed {
    pub rows_affected: u64,
    /// Captured when the command registered a return-value parameter.
    pub return_value: Option<i32>,
}

/// A live connection to one database.
#[async_trait]
pub trait Connection: Send + Sized + 'static {
    /// Run `command` and materialize every row of its first result.
    async fn query(&mut self, command: &Command) -> Result<ResultSet, SqlBridgeError>;

    /// First column of the first row, `Null` when there is none.
    async fn scalar(&mut self, command: &Command) -> Result<RowValues, SqlBridgeError> {
        Ok(self.query(command).await?.first_value())
    }

    /// Run a non-query.
    async fn execute(&mut self, command: &Command) -> Result<Executed, SqlBridgeError>;

    /// Run `command` and hand the connection to a streaming reader.
    async fn into_reader(self, command: &Command) -> Result<RowReader, SqlBridgeError>;

    async fn begin(&mut self) -> Result<(), SqlBridgeError>;

    async fn commit(&mut self) -> Result<(), SqlBridgeError>;

    async fn rollback(&mut self) -> Result<(), SqlBridgeError>;

    /// Close gracefully. Dropping also closes, without waiting for the server.
    async fn close(self) -> Result<(), SqlBridgeError> {
        Ok(())
    }
}

/// Dialect plus I/O: opens connections, builds commands and parameters, and implements the
/// table-level operations.
#[async_trait]
pub trait Driver: Dialect + Sized + 'static {
    type Connection: Connection;

    /// # Errors
    /// `ConnectionError` when the DSN is malformed or the server cannot be reached.
    async fn open_connection(&self, dsn: &str) -> Result<Self::Connection, SqlBridgeError>;

    fn create_command(&self, text: &str, kind: CommandKind) -> Command {
        Command::new(text, kind)
    }

    fn create_parameter(&self, name: &str, value: RowValues) -> Param;

    /// Slot for a stored procedure's 32-bit return value.
    fn create_return_parameter(&self) -> Param {
        Param::return_value("returnValue")
    }

    fn supports_table_valued_parameter(&self) -> bool {
        false
    }

    /// Load every row of `table` in one transaction; returns the number of rows written.
    async fn bulk_insert(
        &self,
        conn: &mut Self::Connection,
        table: &TableData,
    ) -> Result<u64, SqlBridgeError>;

    /// Pass `table` to `procedure` as a table-valued parameter; returns the procedure's
    /// return value.
    async fn table_valued_call(
        &self,
        _conn: &mut Self::Connection,
        procedure: &str,
        _table: &TableData,
    ) -> Result<i32, SqlBridgeError> {
        Err(SqlBridgeError::UnsupportedOperation(format!(
            "{} cannot pass a table to procedure {procedure}",
            self.name()
        )))
    }

    async fn table_exists(&self, db: &Db<Self>, table: &str) -> Result<bool, SqlBridgeError>;

    async fn create_table(
        &self,
        db: &Db<Self>,
        table: &str,
        definitions: &[&str],
        if_not_exists: bool,
    ) -> Result<bool, SqlBridgeError>;

    async fn drop_table(
        &self,
        db: &Db<Self>,
        table: &str,
        if_exists: bool,
    ) -> Result<bool, SqlBridgeError>;

    async fn truncate_table(
        &self,
        db: &Db<Self>,
        table: &str,
        reset_identity: bool,
    ) -> Result<bool, SqlBridgeError>;

    /// Errors that must propagate even from [`Db::try_run`].
    fn is_fatal_error(&self, error: &SqlBridgeError) -> bool {
        error.is_connection_failure()
    }
}
