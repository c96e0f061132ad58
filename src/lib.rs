//! Dialect-neutral SQL access for `PostgreSQL` and SQL Server.
//!
//! A [`Db`] pairs a [`Driver`](driver::Driver) with a connection string and runs builder
//! statements, raw SQL, stored procedures and table operations, opening and closing a
//! connection per call:
//!
//! ```rust,no_run
//! use sql_bridge::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlBridgeError> {
//! let db = Db::new(PgDriver, "host=localhost user=app dbname=shop");
//! db.insert("users", record! { name: "Ann", age: 30 }).await?;
//! let adults: i64 = db
//!     .statement_scalar(db.qb().from("users", None).select(&["count(*)"]).where_op(
//!         "age",
//!         ">=",
//!         18,
//!         Conjunction::And,
//!     ))
//!     .await?;
//! # let _ = adults;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod query_builder;
pub mod record;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConnectionStrings, DsnProvider};
pub use db::{Db, Outcome, ResultMode};
pub use error::SqlBridgeError;
pub use query_builder::{Conjunction, Filter, QueryBuilder, QueryOptions};
pub use record::Record;
pub use results::{CustomDbRow, ResultSet, RowReader};
pub use types::{DatabaseType, FromRowValue, RowValues};

/// Engine over the `PostgreSQL` driver.
#[cfg(feature = "postgres")]
pub type PgDb = Db<postgres::PgDriver>;

/// Engine over the SQL Server driver.
#[cfg(feature = "mssql")]
pub type MssqlDb = Db<mssql::MssqlDriver>;
