use crate::db::Db;
use crate::driver::Driver;
use crate::error::SqlBridgeError;
use crate::query_builder::QueryBuilder;
use crate::record;

use super::{Dialect, table_definitions};

/// SQL Server syntax: `@column` placeholders, `TOP n` and `OFFSET .. FETCH NEXT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsDialect;

impl Dialect for MsDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn parameter_name(&self, _builder: &QueryBuilder<'_>, column: &str) -> String {
        format!("@{column}")
    }

    fn pagination_prefix(&self, builder: &QueryBuilder<'_>, mut sql: String) -> String {
        if let Some(limit) = builder.limit_value()
            && builder.offset_value().is_none()
        {
            sql.push_str(&format!(" TOP {limit}"));
        }
        sql
    }

    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, mut sql: String) -> String {
        if let (Some(limit), Some(offset)) = (builder.limit_value(), builder.offset_value()) {
            sql.push_str(&format!(" OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"));
        }
        sql
    }
}

/// `@name` form of a parameter name.
#[must_use]
pub fn prefixed_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{name}")
    }
}

pub(crate) async fn table_exists<D: Driver>(db: &Db<D>, table: &str) -> Result<bool, SqlBridgeError> {
    let id: i64 = db
        .query_scalar(
            "SELECT ISNULL(OBJECT_ID(@tableName, 'U'), 0) c",
            record! { tableName: table },
        )
        .await?;
    Ok(id > 0)
}

pub(crate) async fn create_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    definitions: &[&str],
    if_not_exists: bool,
) -> Result<bool, SqlBridgeError> {
    if if_not_exists && table_exists(db, table).await? {
        return Ok(true);
    }
    db.try_run(
        &format!("CREATE TABLE {table} {}", table_definitions(definitions)),
        (),
    )
    .await
}

pub(crate) async fn drop_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    if_exists: bool,
) -> Result<bool, SqlBridgeError> {
    if if_exists && !table_exists(db, table).await? {
        return Ok(true);
    }
    db.try_run(&format!("DROP TABLE {table}"), ()).await
}

pub(crate) async fn truncate_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    reset_identity: bool,
) -> Result<bool, SqlBridgeError> {
    if reset_identity {
        return Err(SqlBridgeError::UnsupportedOperation(
            "TRUNCATE with identity reset is not available on SQL Server".to_string(),
        ));
    }
    db.try_run(&format!("TRUNCATE TABLE {table}"), ()).await
}
