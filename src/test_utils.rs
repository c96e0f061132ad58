//! Scripted in-memory driver for exercising the engine without a database.
//!
//! Each command run through a [`MockConnection`] consumes the next [`Script`] entry and is
//! recorded, along with connection lifecycle events, in state shared by every clone of
//! the [`MockDriver`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::db::Db;
use crate::dialect::{self, Dialect, MsDialect, PgDialect};
use crate::driver::{Command, Connection, Driver, Executed, Param, TableData};
use crate::error::SqlBridgeError;
use crate::query_builder::QueryBuilder;
use crate::results::{ResultSet, RowReader};
use crate::types::{DatabaseType, RowValues};

/// One scripted response.
#[derive(Debug)]
pub enum Script {
    /// Rows for a query or reader; a non-query reports the row count as affected.
    Rows(ResultSet),
    /// Value for a scalar; a query sees it as one row with column `value`.
    Scalar(RowValues),
    /// Result of a non-query.
    Executed {
        rows_affected: u64,
        return_value: Option<i32>,
    },
    /// The command fails with this error.
    Fail(SqlBridgeError),
    /// The next connection attempt is refused.
    RefuseConnection(String),
}

/// Connection lifecycle events, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Open,
    Begin,
    Commit,
    Rollback,
    Close,
    Drop,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Script>,
    commands: Vec<Command>,
    events: Vec<Event>,
    loaded: Vec<TableData>,
    open: usize,
}

/// Driver that answers from a script.
#[derive(Debug, Clone)]
pub struct MockDriver {
    kind: DatabaseType,
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockDriver {
    /// A driver speaking the syntax of `kind`.
    #[must_use]
    pub fn new(kind: DatabaseType) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Engine over this driver with a placeholder DSN.
    #[must_use]
    pub fn db(&self) -> Db<MockDriver> {
        Db::new(self.clone(), "mock://")
    }

    /// Queue a response.
    pub fn push(&self, entry: Script) {
        lock(&self.state).script.push_back(entry);
    }

    /// Every command run so far.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        lock(&self.state).commands.clone()
    }

    #[must_use]
    pub fn last_command(&self) -> Option<Command> {
        lock(&self.state).commands.last().cloned()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        lock(&self.state).events.clone()
    }

    /// Tables handed to `bulk_insert` or `table_valued_call`.
    #[must_use]
    pub fn loaded_tables(&self) -> Vec<TableData> {
        lock(&self.state).loaded.clone()
    }

    /// Connections currently alive.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        lock(&self.state).open
    }

    fn dialect(&self) -> &dyn Dialect {
        match self.kind {
            DatabaseType::Mssql => &MsDialect,
            DatabaseType::Postgres => &PgDialect,
        }
    }
}

impl Dialect for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn parameter_name(&self, builder: &QueryBuilder<'_>, column: &str) -> String {
        self.dialect().parameter_name(builder, column)
    }

    fn pagination_prefix(&self, builder: &QueryBuilder<'_>, sql: String) -> String {
        self.dialect().pagination_prefix(builder, sql)
    }

    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, sql: String) -> String {
        self.dialect().pagination_suffix(builder, sql)
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Connection = MockConnection;

    async fn open_connection(&self, dsn: &str) -> Result<MockConnection, SqlBridgeError> {
        let mut state = lock(&self.state);
        if let Some(Script::RefuseConnection(_)) = state.script.front()
            && let Some(Script::RefuseConnection(message)) = state.script.pop_front()
        {
            return Err(SqlBridgeError::connection(format!("{dsn}: {message}")));
        }
        state.open += 1;
        state.events.push(Event::Open);
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }

    fn create_parameter(&self, name: &str, value: RowValues) -> Param {
        match self.kind {
            DatabaseType::Mssql => Param::named(dialect::mssql::prefixed_name(name), value),
            DatabaseType::Postgres => Param::named(name, value),
        }
    }

    fn create_return_parameter(&self) -> Param {
        match self.kind {
            DatabaseType::Mssql => Param::return_value("@returnValue"),
            DatabaseType::Postgres => Param::return_value("returnValue"),
        }
    }

    fn supports_table_valued_parameter(&self) -> bool {
        self.kind == DatabaseType::Mssql
    }

    async fn bulk_insert(
        &self,
        conn: &mut MockConnection,
        table: &TableData,
    ) -> Result<u64, SqlBridgeError> {
        conn.begin().await?;
        let command = Command::new(
            format!("BULK INSERT {} ({})", table.name, table.column_list()),
            crate::driver::CommandKind::Text,
        );
        match conn.execute(&command).await {
            Ok(_) => {
                conn.commit().await?;
                lock(&self.state).loaded.push(table.clone());
                Ok(table.rows.len() as u64)
            }
            Err(e) => {
                conn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn table_valued_call(
        &self,
        conn: &mut MockConnection,
        procedure: &str,
        table: &TableData,
    ) -> Result<i32, SqlBridgeError> {
        lock(&self.state).loaded.push(table.clone());
        let command = Command::new(
            format!("EXEC {procedure} @{} = <table>", table.name),
            crate::driver::CommandKind::Text,
        );
        Ok(conn.execute(&command).await?.return_value.unwrap_or_default())
    }

    async fn table_exists(&self, db: &Db<Self>, table: &str) -> Result<bool, SqlBridgeError> {
        match self.kind {
            DatabaseType::Mssql => dialect::mssql::table_exists(db, table).await,
            DatabaseType::Postgres => dialect::postgres::table_exists(db, table).await,
        }
    }

    async fn create_table(
        &self,
        db: &Db<Self>,
        table: &str,
        definitions: &[&str],
        if_not_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        match self.kind {
            DatabaseType::Mssql => {
                dialect::mssql::create_table(db, table, definitions, if_not_exists).await
            }
            DatabaseType::Postgres => {
                dialect::postgres::create_table(db, table, definitions, if_not_exists).await
            }
        }
    }

    async fn drop_table(
        &self,
        db: &Db<Self>,
        table: &str,
        if_exists: bool,
    ) -> Result<bool, SqlBridgeError> {
        match self.kind {
            DatabaseType::Mssql => dialect::mssql::drop_table(db, table, if_exists).await,
            DatabaseType::Postgres => dialect::postgres::drop_table(db, table, if_exists).await,
        }
    }

    async fn truncate_table(
        &self,
        db: &Db<Self>,
        table: &str,
        reset_identity: bool,
    ) -> Result<bool, SqlBridgeError> {
        match self.kind {
            DatabaseType::Mssql => {
                dialect::mssql::truncate_table(db, table, reset_identity).await
            }
            DatabaseType::Postgres => {
                dialect::postgres::truncate_table(db, table, reset_identity).await
            }
        }
    }
}

/// Connection handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn next(&self, command: &Command) -> Option<Script> {
        let mut state = lock(&self.state);
        state.commands.push(command.clone());
        state.script.pop_front()
    }

    fn record(&self, event: Event) {
        lock(&self.state).events.push(event);
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.open = state.open.saturating_sub(1);
        state.events.push(Event::Drop);
    }
}

fn single_value(value: RowValues) -> ResultSet {
    let mut rows = ResultSet::with_columns(vec!["value".to_string()], 1);
    rows.add_row_values(vec![value]);
    rows
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, command: &Command) -> Result<ResultSet, SqlBridgeError> {
        match self.next(command) {
            Some(Script::Rows(rows)) => Ok(rows),
            Some(Script::Scalar(value)) => Ok(single_value(value)),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Executed { .. } | Script::RefuseConnection(_)) | None => {
                Ok(ResultSet::default())
            }
        }
    }

    async fn scalar(&mut self, command: &Command) -> Result<RowValues, SqlBridgeError> {
        match self.next(command) {
            Some(Script::Rows(rows)) => Ok(rows.first_value()),
            Some(Script::Scalar(value)) => Ok(value),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Executed { .. } | Script::RefuseConnection(_)) | None => {
                Ok(RowValues::Null)
            }
        }
    }

    async fn execute(&mut self, command: &Command) -> Result<Executed, SqlBridgeError> {
        match self.next(command) {
            Some(Script::Executed {
                rows_affected,
                return_value,
            }) => Ok(Executed {
                rows_affected,
                return_value,
            }),
            Some(Script::Rows(rows)) => Ok(Executed {
                rows_affected: rows.len() as u64,
                return_value: None,
            }),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Scalar(_) | Script::RefuseConnection(_)) | None => Ok(Executed::default()),
        }
    }

    async fn into_reader(mut self, command: &Command) -> Result<RowReader, SqlBridgeError> {
        let rows = self.query(command).await?;
        let columns = rows.column_names().as_ref().clone();
        let values = stream::iter(rows.into_rows().into_iter().map(|r| Ok(r.into_values()))).boxed();
        Ok(RowReader::new(columns, values, Some(Box::new(self))))
    }

    async fn begin(&mut self) -> Result<(), SqlBridgeError> {
        self.record(Event::Begin);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        self.record(Event::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        self.record(Event::Rollback);
        Ok(())
    }

    async fn close(self) -> Result<(), SqlBridgeError> {
        self.record(Event::Close);
        Ok(())
    }
}
