//! The execution engine applications call.
//!
//! A [`Db`] owns a driver and a DSN. Every operation opens its own connection and closes
//! it on every exit path, except when ownership moves into a returned [`RowReader`] or the
//! caller supplied the connection (see [`Db::run_with`]).

mod procedures;
mod tables;

use crate::driver::{Command, CommandKind, Connection, Driver, Params, Param};
use crate::error::SqlBridgeError;
use crate::query_builder::QueryBuilder;
use crate::results::{CustomDbRow, ResultSet, RowReader};
use crate::types::{FromRowValue, RowValues};

/// What the caller wants back from a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Streaming reader that owns the connection.
    Reader,
    /// First column of the first row.
    Scalar,
    /// Affected rows, or the return value when one was registered.
    Affected,
}

/// Result of [`Db::run`], shaped by the requested [`ResultMode`].
#[derive(Debug)]
pub enum Outcome {
    Reader(RowReader),
    Scalar(RowValues),
    Affected(i64),
}

impl Outcome {
    /// # Errors
    /// `MappingError` if the outcome is not a reader.
    pub fn into_reader(self) -> Result<RowReader, SqlBridgeError> {
        match self {
            Outcome::Reader(reader) => Ok(reader),
            other => Err(other.mismatch("reader")),
        }
    }

    /// # Errors
    /// `MappingError` if the outcome is not a scalar or does not convert to `T`.
    pub fn into_scalar<T: FromRowValue>(self) -> Result<T, SqlBridgeError> {
        match self {
            Outcome::Scalar(value) => T::from_row_value(value),
            other => Err(other.mismatch("scalar")),
        }
    }

    /// # Errors
    /// `MappingError` if the outcome is not an affected count.
    pub fn into_affected(self) -> Result<i64, SqlBridgeError> {
        match self {
            Outcome::Affected(n) => Ok(n),
            other => Err(other.mismatch("affected count")),
        }
    }

    fn mismatch(&self, wanted: &str) -> SqlBridgeError {
        let got = match self {
            Outcome::Reader(_) => "reader",
            Outcome::Scalar(_) => "scalar",
            Outcome::Affected(_) => "affected count",
        };
        SqlBridgeError::MappingError(format!("expected {wanted} outcome, got {got}"))
    }
}

/// Who closes the connection a command runs on.
enum ConnectionScope<'c, C> {
    /// Opened by the engine; closed unless moved into a reader.
    Owned(C),
    /// Supplied by the caller; never closed here.
    Borrowed(&'c mut C),
}

/// Dialect-neutral database handle.
#[derive(Debug, Clone)]
pub struct Db<D: Driver> {
    driver: D,
    dsn: String,
}

impl<D: Driver> Db<D> {
    pub fn new(driver: D, dsn: impl Into<String>) -> Self {
        Self {
            driver,
            dsn: dsn.into(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// New query builder speaking this engine's dialect.
    pub fn qb(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.driver)
    }

    /// Open a caller-owned connection.
    ///
    /// Combine with [`Connection::begin`]/[`Connection::commit`] and [`Db::run_with`] to run
    /// several statements in one transaction.
    ///
    /// # Errors
    /// `ConfigError` for an empty DSN, otherwise whatever the driver reports.
    pub async fn connect(&self) -> Result<D::Connection, SqlBridgeError> {
        if self.dsn.trim().is_empty() {
            return Err(SqlBridgeError::ConfigError(
                "connection string is empty".to_string(),
            ));
        }
        self.driver.open_connection(&self.dsn).await
    }

    /// Build a command, creating one driver parameter per value.
    pub fn command(&self, text: &str, kind: CommandKind, params: impl Into<Params>) -> Command {
        let mut command = self.driver.create_command(text, kind);
        match params.into() {
            Params::None => {}
            Params::Named(record) => {
                for (name, value) in record.into_pairs() {
                    command.params.push(self.driver.create_parameter(&name, value));
                }
            }
            Params::Positional(values) => {
                command
                    .params
                    .extend(values.into_iter().map(Param::positional));
            }
        }
        command
    }

    /// Validate a builder and turn it into a command plus its scalar flag.
    ///
    /// # Errors
    /// Propagates the builder's validation errors.
    pub fn statement_command(&self, qb: QueryBuilder<'_>) -> Result<(Command, bool), SqlBridgeError> {
        let statement = qb.statement()?;
        let mut command = self.driver.create_command(&statement.sql, CommandKind::Text);
        for (name, value) in statement.params {
            command.params.push(self.driver.create_parameter(&name, value));
        }
        Ok((command, statement.scalar))
    }

    /// Run `command` on a fresh connection.
    ///
    /// # Errors
    /// Any failure, including opening the connection, is wrapped in
    /// [`SqlBridgeError::ExecutionError`] carrying the command text.
    pub async fn run(&self, command: Command, mode: ResultMode) -> Result<Outcome, SqlBridgeError> {
        tracing::debug!(
            dialect = self.driver.name(),
            kind = ?command.kind,
            params = command.params.len(),
            ?mode,
            sql = %command.text,
            "run"
        );
        let outcome = match self.connect().await {
            Ok(conn) => self.dispatch(ConnectionScope::Owned(conn), &command, mode).await,
            Err(e) => Err(e),
        };
        outcome.map_err(|e| SqlBridgeError::execution(command.text, e))
    }

    /// Run `command` on a caller-owned connection, which stays open.
    ///
    /// # Errors
    /// `UnsupportedOperation` for [`ResultMode::Reader`] (use [`Db::read_with`]); other
    /// failures are wrapped in [`SqlBridgeError::ExecutionError`].
    pub async fn run_with(
        &self,
        conn: &mut D::Connection,
        command: Command,
        mode: ResultMode,
    ) -> Result<Outcome, SqlBridgeError> {
        tracing::debug!(
            dialect = self.driver.name(),
            kind = ?command.kind,
            ?mode,
            sql = %command.text,
            "run on caller connection"
        );
        self.dispatch(ConnectionScope::Borrowed(conn), &command, mode)
            .await
            .map_err(|e| SqlBridgeError::execution(command.text, e))
    }

    /// Open a reader on a caller-supplied connection, moving it into the reader.
    ///
    /// # Errors
    /// Failures are wrapped in [`SqlBridgeError::ExecutionError`].
    pub async fn read_with(
        &self,
        conn: D::Connection,
        command: Command,
    ) -> Result<RowReader, SqlBridgeError> {
        self.dispatch(ConnectionScope::Owned(conn), &command, ResultMode::Reader)
            .await
            .and_then(Outcome::into_reader)
            .map_err(|e| SqlBridgeError::execution(command.text, e))
    }

    /// Run `sql` as a non-query and report success.
    ///
    /// # Errors
    /// Only errors the driver classifies as fatal (see [`Driver::is_fatal_error`]).
    pub async fn try_run(&self, sql: &str, params: impl Into<Params>) -> Result<bool, SqlBridgeError> {
        let command = self.command(sql, CommandKind::Text, params);
        match self.run(command, ResultMode::Affected).await {
            Ok(_) => Ok(true),
            Err(e) if self.driver.is_fatal_error(&e) => Err(e),
            Err(e) => {
                tracing::warn!(
                    dialect = self.driver.name(),
                    error = %e,
                    cause = %e.root_cause(),
                    "statement failed"
                );
                Ok(false)
            }
        }
    }

    async fn dispatch(
        &self,
        scope: ConnectionScope<'_, D::Connection>,
        command: &Command,
        mode: ResultMode,
    ) -> Result<Outcome, SqlBridgeError> {
        match (scope, mode) {
            (ConnectionScope::Owned(conn), ResultMode::Reader) => {
                conn.into_reader(command).await.map(Outcome::Reader)
            }
            (ConnectionScope::Borrowed(_), ResultMode::Reader) => {
                Err(SqlBridgeError::UnsupportedOperation(
                    "a reader must own its connection; use read_with".to_string(),
                ))
            }
            (ConnectionScope::Owned(mut conn), mode) => {
                // on error the connection is dropped, which closes it
                let outcome = Self::finish(&mut conn, command, mode).await?;
                if let Err(e) = conn.close().await {
                    tracing::warn!(error = %e, "closing connection failed");
                }
                Ok(outcome)
            }
            (ConnectionScope::Borrowed(conn), mode) => Self::finish(conn, command, mode).await,
        }
    }

    async fn finish(
        conn: &mut D::Connection,
        command: &Command,
        mode: ResultMode,
    ) -> Result<Outcome, SqlBridgeError> {
        match mode {
            ResultMode::Scalar => conn.scalar(command).await.map(Outcome::Scalar),
            ResultMode::Affected => {
                let executed = conn.execute(command).await?;
                let affected = match executed.return_value {
                    Some(value) => i64::from(value),
                    None => i64::try_from(executed.rows_affected).map_err(|e| {
                        SqlBridgeError::MappingError(format!("affected row count overflow: {e}"))
                    })?,
                };
                Ok(Outcome::Affected(affected))
            }
            ResultMode::Reader => Err(SqlBridgeError::UnsupportedOperation(
                "reader mode needs an owned connection".to_string(),
            )),
        }
    }

    /// Drain a reader into memory, then close it. The reader is consumed, so its
    /// connection is released even when fetching fails.
    ///
    /// # Errors
    /// Propagates fetch errors.
    pub async fn read_rows(&self, reader: RowReader) -> Result<ResultSet, SqlBridgeError> {
        reader.read_all().await
    }

    /// Drain a reader into memory and leave it open; the connection is released when the
    /// caller drops or closes the reader.
    ///
    /// # Errors
    /// Propagates fetch errors.
    pub async fn read_rows_open(&self, reader: &mut RowReader) -> Result<ResultSet, SqlBridgeError> {
        reader.read_remaining().await
    }

    /// Next row of a reader, `None` at the end.
    ///
    /// # Errors
    /// Propagates fetch errors.
    pub async fn read_row(&self, reader: &mut RowReader) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        reader.next_row().await
    }

    /// Streaming reader over raw SQL.
    ///
    /// # Errors
    /// See [`Db::run`].
    pub async fn query_reader(&self, sql: &str, params: impl Into<Params>) -> Result<RowReader, SqlBridgeError> {
        let command = self.command(sql, CommandKind::Text, params);
        self.run(command, ResultMode::Reader).await?.into_reader()
    }

    /// Every row of raw SQL.
    ///
    /// # Errors
    /// See [`Db::run`].
    pub async fn query_result(&self, sql: &str, params: impl Into<Params>) -> Result<ResultSet, SqlBridgeError> {
        let reader = self.query_reader(sql, params).await?;
        self.read_rows(reader).await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn query_first(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        Ok(self.query_result(sql, params).await?.into_rows().into_iter().next())
    }

    /// First column of the first row, converted to `T`.
    ///
    /// # Errors
    /// See [`Db::run`]; `MappingError` when the value does not convert.
    pub async fn query_scalar<T: FromRowValue>(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<T, SqlBridgeError> {
        let command = self.command(sql, CommandKind::Text, params);
        self.run(command, ResultMode::Scalar).await?.into_scalar()
    }

    /// Run raw SQL as a non-query; returns affected rows.
    ///
    /// # Errors
    /// See [`Db::run`].
    pub async fn query_execute(&self, sql: &str, params: impl Into<Params>) -> Result<i64, SqlBridgeError> {
        let command = self.command(sql, CommandKind::Text, params);
        self.run(command, ResultMode::Affected).await?.into_affected()
    }

    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_reader(&self, qb: QueryBuilder<'_>) -> Result<RowReader, SqlBridgeError> {
        let (command, _) = self.statement_command(qb)?;
        self.run(command, ResultMode::Reader).await?.into_reader()
    }

    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_result(&self, qb: QueryBuilder<'_>) -> Result<ResultSet, SqlBridgeError> {
        let reader = self.statement_reader(qb).await?;
        self.read_rows(reader).await
    }

    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_first(&self, qb: QueryBuilder<'_>) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        Ok(self.statement_result(qb).await?.into_rows().into_iter().next())
    }

    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_scalar<T: FromRowValue>(&self, qb: QueryBuilder<'_>) -> Result<T, SqlBridgeError> {
        let (command, _) = self.statement_command(qb)?;
        self.run(command, ResultMode::Scalar).await?.into_scalar()
    }

    /// Run a builder statement in the mode its scalar flag selects.
    ///
    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_run(&self, qb: QueryBuilder<'_>) -> Result<Outcome, SqlBridgeError> {
        let (command, scalar) = self.statement_command(qb)?;
        let mode = if scalar {
            ResultMode::Scalar
        } else {
            ResultMode::Affected
        };
        self.run(command, mode).await
    }

    /// # Errors
    /// Builder validation errors, then see [`Db::run`].
    pub async fn statement_execute(&self, qb: QueryBuilder<'_>) -> Result<i64, SqlBridgeError> {
        let (command, _) = self.statement_command(qb)?;
        self.run(command, ResultMode::Affected).await?.into_affected()
    }
}
