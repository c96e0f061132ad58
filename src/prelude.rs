//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConnectionStrings, DsnProvider};
pub use crate::db::{Db, Outcome, ResultMode};
pub use crate::driver::{
    ColumnKind, Command, CommandKind, Connection, Driver, Param, Params, TableData,
};
pub use crate::error::SqlBridgeError;
pub use crate::query_builder::{Conjunction, Filter, QueryBuilder, QueryOptions};
pub use crate::record;
pub use crate::record::Record;
pub use crate::results::{CustomDbRow, ResultSet, RowReader};
pub use crate::types::{DatabaseType, FromRowValue, RowValues};

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlConnection, MssqlDriver};
#[cfg(feature = "postgres")]
pub use crate::postgres::{PgConnection, PgDriver};
