use crate::db::Db;
use crate::driver::Driver;
use crate::error::SqlBridgeError;
use crate::query_builder::{QueryBuilder, QueryOptions};
use crate::record;

use super::{Dialect, table_definitions};

/// `PostgreSQL` syntax: `$N` placeholders numbered in binding order, `LIMIT` and `OFFSET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDialect;

impl Dialect for PgDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn parameter_name(&self, builder: &QueryBuilder<'_>, _column: &str) -> String {
        format!("${}", builder.bound_count() + 1)
    }

    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, mut sql: String) -> String {
        if let Some(limit) = builder.limit_value() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = builder.offset_value() {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }
}

pub(crate) async fn table_exists<D: Driver>(db: &Db<D>, table: &str) -> Result<bool, SqlBridgeError> {
    let count = db
        .count(
            "pg_tables",
            record! { schemaname: "public", tablename: table },
            QueryOptions::default(),
        )
        .await?;
    Ok(count > 0)
}

pub(crate) async fn create_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    definitions: &[&str],
    if_not_exists: bool,
) -> Result<bool, SqlBridgeError> {
    let guard = if if_not_exists { " IF NOT EXISTS" } else { "" };
    db.try_run(
        &format!("CREATE TABLE{guard} {table} {}", table_definitions(definitions)),
        (),
    )
    .await
}

pub(crate) async fn drop_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    if_exists: bool,
) -> Result<bool, SqlBridgeError> {
    let guard = if if_exists { " IF EXISTS" } else { "" };
    db.try_run(&format!("DROP TABLE{guard} {table}"), ()).await
}

pub(crate) async fn truncate_table<D: Driver>(
    db: &Db<D>,
    table: &str,
    reset_identity: bool,
) -> Result<bool, SqlBridgeError> {
    let restart = if reset_identity { " RESTART IDENTITY" } else { "" };
    db.try_run(&format!("TRUNCATE TABLE {table}{restart}"), ()).await
}
