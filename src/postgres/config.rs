use std::str::FromStr;

use tokio_postgres::{Client, Config, NoTls};

use crate::error::SqlBridgeError;

/// Parse a libpq key/value string or a `postgres://` URL.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` if the DSN is malformed or names no database.
pub fn parse_dsn(dsn: &str) -> Result<Config, SqlBridgeError> {
    let config = Config::from_str(dsn)
        .map_err(|e| SqlBridgeError::connection_caused_by("invalid Postgres DSN", e))?;
    if config.get_hosts().is_empty() && config.get_hostaddrs().is_empty() {
        return Err(SqlBridgeError::connection("Postgres DSN names no host"));
    }
    Ok(config)
}

/// Connect and spawn the connection task.
///
/// The task lives until the returned client is dropped; a connection fault is logged,
/// and the next command on the client fails with it.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` if the server cannot be reached or rejects
/// the login.
pub async fn connect(
    config: &Config,
) -> Result<(Client, tokio::task::JoinHandle<()>), SqlBridgeError> {
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| SqlBridgeError::connection_caused_by("Postgres connection failed", e))?;
    let task = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "postgres connection error");
        }
    });
    Ok((client, task))
}
