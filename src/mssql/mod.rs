//! SQL Server driver over `tiberius`.
//!
//! - config: ADO.NET connection strings and TCP setup
//! - params: binding `RowValues` to queries
//! - query: row extraction and result building
//! - connection: [`MssqlConnection`], command rendering and readers
//! - bulk: bulk loads and table-valued procedure calls
//! - driver: [`MssqlDriver`]

mod bulk;
pub mod config;
mod connection;
mod driver;
pub mod params;
pub mod query;

pub use config::MssqlClient;
pub use connection::MssqlConnection;
pub use driver::MssqlDriver;
