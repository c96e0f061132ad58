use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::SqlBridgeError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Parse an ADO.NET connection string such as
/// `server=tcp:db.internal,1433;database=shop;user id=app;password=...;TrustServerCertificate=true`.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` if the string is malformed.
pub fn parse_dsn(dsn: &str) -> Result<Config, SqlBridgeError> {
    Config::from_ado_string(dsn)
        .map_err(|e| SqlBridgeError::connection_caused_by("invalid SQL Server connection string", e))
}

async fn open_stream(config: &Config) -> Result<TcpStream, SqlBridgeError> {
    // resolves named instances through the browser service, plain host:port otherwise
    let tcp = TcpStream::connect_named(config).await.map_err(|e| {
        SqlBridgeError::connection_caused_by(format!("cannot reach {}", config.get_addr()), e)
    })?;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

/// Open a client, following one server routing redirect.
///
/// # Errors
/// Returns `SqlBridgeError::ConnectionError` if the server cannot be reached or rejects the
/// login.
pub async fn connect(config: Config) -> Result<MssqlClient, SqlBridgeError> {
    let tcp = open_stream(&config).await?;
    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            tracing::debug!(%host, port, "sql server redirected the connection");
            let mut config = config;
            config.host(&host);
            config.port(port);
            let tcp = open_stream(&config).await?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| SqlBridgeError::connection_caused_by("SQL Server login failed", e))
        }
        Err(e) => Err(SqlBridgeError::connection_caused_by(
            "SQL Server login failed",
            e,
        )),
    }
}
