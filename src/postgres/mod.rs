//! `PostgreSQL` driver over `tokio-postgres`.
//!
//! - config: DSN parsing and connection setup
//! - params: `RowValues` to wire-type conversion
//! - query: row extraction and result building
//! - connection: [`PgConnection`], command rendering and readers
//! - bulk: binary `COPY` loads
//! - driver: [`PgDriver`]

mod bulk;
pub mod config;
mod connection;
mod driver;
pub mod params;
pub mod query;

pub use connection::PgConnection;
pub use driver::PgDriver;
