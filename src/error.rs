use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: Option<Box<SqlBridgeError>>,
    },

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Query build error: {0}")]
    QueryBuildError(String),

    /// A statement failed; `command` is the text that was sent.
    #[error("Error execution of {command}")]
    ExecutionError {
        command: String,
        #[source]
        source: Box<SqlBridgeError>,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlBridgeError {
    /// Connection failure without an underlying client error.
    pub fn connection(message: impl Into<String>) -> Self {
        SqlBridgeError::ConnectionError {
            message: message.into(),
            source: None,
        }
    }

    /// Connection failure caused by `source`.
    pub fn connection_caused_by(message: impl Into<String>, source: impl Into<SqlBridgeError>) -> Self {
        SqlBridgeError::ConnectionError {
            message: message.into(),
            source: Some(Box::new(source.into())),
        }
    }

    /// Wrap `source` as the failure of `command`.
    pub fn execution(command: impl Into<String>, source: SqlBridgeError) -> Self {
        SqlBridgeError::ExecutionError {
            command: command.into(),
            source: Box::new(source),
        }
    }

    /// Innermost error, skipping execution and connection wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &SqlBridgeError {
        match self {
            SqlBridgeError::ExecutionError { source, .. } => source.root_cause(),
            SqlBridgeError::ConnectionError {
                source: Some(source),
                ..
            } => source.root_cause(),
            other => other,
        }
    }

    /// True when any error in the chain is a connection failure.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        match self {
            SqlBridgeError::ConnectionError { .. } => true,
            SqlBridgeError::ExecutionError { source, .. } => source.is_connection_failure(),
            _ => false,
        }
    }

    /// Command text of the outermost execution wrapper, if any.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        match self {
            SqlBridgeError::ExecutionError { command, .. } => Some(command),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_skips_wrappers() {
        let err = SqlBridgeError::execution(
            "SELECT 1",
            SqlBridgeError::connection_caused_by(
                "login",
                SqlBridgeError::Other("28P01 bad password".into()),
            ),
        );
        assert!(matches!(err.root_cause(), SqlBridgeError::Other(m) if m.starts_with("28P01")));
        assert!(err.is_connection_failure());
        assert_eq!(err.command(), Some("SELECT 1"));
        assert_eq!(err.to_string(), "Error execution of SELECT 1");
    }

    #[test]
    fn plain_errors_are_not_connection_failures() {
        let err = SqlBridgeError::execution("bad sql", SqlBridgeError::Other("syntax".into()));
        assert!(!err.is_connection_failure());
    }
}
