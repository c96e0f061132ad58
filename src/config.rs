//! Connection-string lookup.
//!
//! Applications keep their DSNs in a JSON document shaped like
//!
//! ```json
//! { "ConnectionStrings": { "main": "host=localhost user=app dbname=shop" } }
//! ```
//!
//! and hand a [`DsnProvider`] to [`Db::from_provider`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::driver::Driver;
use crate::error::SqlBridgeError;

/// Source of named connection strings.
pub trait DsnProvider {
    /// # Errors
    /// `ConfigError` when `name` is unknown or empty.
    fn dsn(&self, name: &str) -> Result<String, SqlBridgeError>;
}

/// Named connection strings, deserialized from the `ConnectionStrings` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStrings {
    #[serde(rename = "ConnectionStrings", default)]
    pub entries: HashMap<String, String>,
}

impl ConnectionStrings {
    /// # Errors
    /// `ConfigError` if `json` is not a valid document.
    pub fn from_json(json: &str) -> Result<Self, SqlBridgeError> {
        serde_json::from_str(json)
            .map_err(|e| SqlBridgeError::ConfigError(format!("invalid connection strings: {e}")))
    }

    /// # Errors
    /// `IoError` if the file cannot be read, `ConfigError` if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SqlBridgeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, dsn: impl Into<String>) -> Self {
        self.entries.insert(name.into(), dsn.into());
        self
    }
}

impl DsnProvider for ConnectionStrings {
    fn dsn(&self, name: &str) -> Result<String, SqlBridgeError> {
        match self.entries.get(name) {
            Some(dsn) if !dsn.trim().is_empty() => Ok(dsn.clone()),
            Some(_) => Err(SqlBridgeError::ConfigError(format!(
                "connection string {name} is empty"
            ))),
            None => Err(SqlBridgeError::ConfigError(format!(
                "no connection string named {name}"
            ))),
        }
    }
}

impl<D: Driver> Db<D> {
    /// Engine for the provider's entry `name`.
    ///
    /// # Errors
    /// Whatever the provider reports for `name`.
    pub fn from_provider(
        driver: D,
        provider: &impl DsnProvider,
        name: &str,
    ) -> Result<Self, SqlBridgeError> {
        Ok(Self::new(driver, provider.dsn(name)?))
    }
}
