use std::borrow::Cow;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_postgres::Client;
use tokio_postgres::types::ToSql;

use super::query::{build_result_set, extract_row};
use crate::driver::{Command, CommandKind, Connection, Executed};
use crate::error::SqlBridgeError;
use crate::results::{ResultSet, RowReader};
use crate::translation::{PlaceholderStyle, translate_named_placeholders};
use crate::types::RowValues;

/// One `PostgreSQL` session.
///
/// Transactions are plain `BEGIN`/`COMMIT`/`ROLLBACK` on the session, so every command run
/// between them joins the transaction. Dropping the connection ends the session and the
/// server rolls back anything still open.
pub struct PgConnection {
    pub(crate) client: Client,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    pub(crate) fn new(client: Client, task: JoinHandle<()>) -> Self {
        Self { client, task }
    }

    /// The underlying client, for statements this crate does not model.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// SQL text actually sent for `command`.
///
/// Stored procedures become `SELECT * FROM name($1, ...)`; named `@name` placeholders in
/// raw text become `$n` in binding order.
pub(crate) fn render(command: &Command) -> Cow<'_, str> {
    match command.kind {
        CommandKind::StoredProcedure => {
            let markers: Vec<String> = (1..=command.inputs().count())
                .map(|n| format!("${n}"))
                .collect();
            Cow::Owned(format!(
                "SELECT * FROM {}({})",
                command.text,
                markers.join(", ")
            ))
        }
        CommandKind::Text => translate_named_placeholders(
            &command.text,
            &command.input_names(),
            PlaceholderStyle::Postgres,
        ),
    }
}

fn bind_values(command: &Command) -> Vec<&RowValues> {
    command.inputs().map(|p| &p.value).collect()
}

fn as_params<'a>(values: &'a [&'a RowValues]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

/// A return value is the first column of the first row when it is a 32-bit integer.
fn return_value(rows: &ResultSet) -> Option<i32> {
    rows.first_value()
        .as_int()
        .and_then(|v| i32::try_from(*v).ok())
}

#[async_trait]
impl Connection for PgConnection {
    async fn query(&mut self, command: &Command) -> Result<ResultSet, SqlBridgeError> {
        let sql = render(command);
        let values = bind_values(command);
        let stmt = self.client.prepare(&sql).await?;
        let rows = self.client.query(&stmt, &as_params(&values)).await?;
        build_result_set(stmt.columns(), &rows)
    }

    async fn execute(&mut self, command: &Command) -> Result<Executed, SqlBridgeError> {
        if command.return_param().is_some() {
            let rows = self.query(command).await?;
            return Ok(Executed {
                rows_affected: rows.len() as u64,
                return_value: return_value(&rows),
            });
        }
        let sql = render(command);
        let values = bind_values(command);
        let stmt = self.client.prepare(&sql).await?;
        let rows_affected = self.client.execute(&stmt, &as_params(&values)).await?;
        Ok(Executed {
            rows_affected,
            return_value: None,
        })
    }

    async fn into_reader(self, command: &Command) -> Result<RowReader, SqlBridgeError> {
        let sql = render(command);
        let values = bind_values(command);
        let stmt = self.client.prepare(&sql).await?;
        let columns = stmt
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();
        let stream = self.client.query_raw(&stmt, values.iter().copied()).await?;
        let rows = Box::pin(stream)
            .map(|row| extract_row(&row?))
            .boxed();
        Ok(RowReader::new(columns, rows, Some(Box::new(self))))
    }

    async fn begin(&mut self) -> Result<(), SqlBridgeError> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self) -> Result<(), SqlBridgeError> {
        let Self { client, task } = self;
        drop(client);
        task.await
            .map_err(|e| SqlBridgeError::Other(format!("postgres connection task failed: {e}")))
    }
}
