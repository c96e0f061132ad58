use std::borrow::Cow;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::config::MssqlClient;
use super::params::bound_query;
use super::query::{build_result_set, extract_row, last_result_value};
use crate::driver::{Command, CommandKind, Connection, Executed};
use crate::error::SqlBridgeError;
use crate::results::{ResultSet, RowReader};
use crate::translation::{PlaceholderStyle, translate_named_placeholders};
use crate::types::RowValues;

/// Rows buffered between the reader task and its consumer.
const READER_BUFFER: usize = 64;

/// One SQL Server session.
///
/// Transactions are `BEGIN`/`COMMIT`/`ROLLBACK TRANSACTION` on the session. Dropping the
/// connection closes the socket and the server aborts any open transaction.
pub struct MssqlConnection {
    pub(crate) client: MssqlClient,
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection").finish_non_exhaustive()
    }
}

impl MssqlConnection {
    pub(crate) fn new(client: MssqlClient) -> Self {
        Self { client }
    }

    /// The underlying client, for statements this crate does not model.
    pub fn client(&mut self) -> &mut MssqlClient {
        &mut self.client
    }

    pub(crate) async fn batch(&mut self, sql: &str) -> Result<(), SqlBridgeError> {
        self.client.execute(sql, &[]).await?;
        Ok(())
    }
}

/// SQL text actually sent for `command`.
///
/// Stored procedures become `EXEC name @a = @P1, ...` (positional inputs pass as
/// `@P1, ...`); a registered return value wraps the call as
/// `DECLARE @returnValue INT; EXEC @returnValue = name ...; SELECT @returnValue AS returnValue;`.
/// Named `@name` placeholders in raw text become `@Pn` in binding order.
pub(crate) fn render(command: &Command) -> Cow<'_, str> {
    match command.kind {
        CommandKind::StoredProcedure => {
            let args: Vec<String> = command
                .inputs()
                .enumerate()
                .map(|(i, p)| match &p.name {
                    Some(name) => format!("{name} = @P{}", i + 1),
                    None => format!("@P{}", i + 1),
                })
                .collect();
            let call = if args.is_empty() {
                command.text.clone()
            } else {
                format!("{} {}", command.text, args.join(", "))
            };
            match command.return_param() {
                Some(ret) => {
                    let var = ret.name.as_deref().unwrap_or("@returnValue");
                    let column = var.trim_start_matches('@');
                    Cow::Owned(format!(
                        "DECLARE {var} INT; EXEC {var} = {call}; SELECT {var} AS {column};"
                    ))
                }
                None => Cow::Owned(format!("EXEC {call}")),
            }
        }
        CommandKind::Text => translate_named_placeholders(
            &command.text,
            &command.input_names(),
            PlaceholderStyle::Mssql,
        ),
    }
}

fn bind_values(command: &Command) -> Vec<RowValues> {
    command.inputs().map(|p| p.value.clone()).collect()
}

/// Aborts the reader task when the reader goes away, which drops the connection.
struct ReaderTask(JoinHandle<()>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    async fn query(&mut self, command: &Command) -> Result<ResultSet, SqlBridgeError> {
        let query = bound_query(render(command).into_owned(), bind_values(command));
        let stream = query.query(&mut self.client).await?;
        build_result_set(stream).await
    }

    async fn execute(&mut self, command: &Command) -> Result<Executed, SqlBridgeError> {
        let query = bound_query(render(command).into_owned(), bind_values(command));
        if command.return_param().is_some() {
            let stream = query.query(&mut self.client).await?;
            let value = last_result_value(stream).await?;
            let return_value = value.as_int().and_then(|v| i32::try_from(*v).ok());
            return Ok(Executed {
                rows_affected: 0,
                return_value,
            });
        }
        let result = query.execute(&mut self.client).await?;
        Ok(Executed {
            rows_affected: result.rows_affected().iter().sum(),
            return_value: None,
        })
    }

    /// Runs the query on a task that owns the connection and forwards rows through a
    /// bounded channel.
    async fn into_reader(self, command: &Command) -> Result<RowReader, SqlBridgeError> {
        let query = bound_query(render(command).into_owned(), bind_values(command));
        let (columns_tx, columns_rx) = oneshot::channel::<Result<Vec<String>, SqlBridgeError>>();
        let (rows_tx, rows_rx) = mpsc::channel(READER_BUFFER);

        let mut conn = self;
        let task = tokio::spawn(async move {
            let mut stream = match query.query(&mut conn.client).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = columns_tx.send(Err(e.into()));
                    return;
                }
            };
            let columns = match stream.columns().await {
                Ok(cols) => cols
                    .map(|cols| cols.iter().map(|col| col.name().to_string()).collect())
                    .unwrap_or_default(),
                Err(e) => {
                    let _ = columns_tx.send(Err(e.into()));
                    return;
                }
            };
            if columns_tx.send(Ok(columns)).is_err() {
                return;
            }
            let mut rows = stream.into_row_stream();
            while let Some(row) = rows.next().await {
                let item = row.map_err(SqlBridgeError::from).and_then(extract_row);
                let failed = item.is_err();
                if rows_tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });
        let guard = ReaderTask(task);

        let columns = columns_rx.await.map_err(|_| {
            SqlBridgeError::Other("SQL Server reader task ended before returning columns".into())
        })??;
        let rows = stream::unfold(rows_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        Ok(RowReader::new(columns, rows, Some(Box::new(guard))))
    }

    async fn begin(&mut self) -> Result<(), SqlBridgeError> {
        self.batch("BEGIN TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        self.batch("COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        self.batch("ROLLBACK TRANSACTION").await
    }

    async fn close(self) -> Result<(), SqlBridgeError> {
        self.client.close().await?;
        Ok(())
    }
}
