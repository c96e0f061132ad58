//! Pure SQL syntax differences between the supported dialects.
//!
//! A [`Dialect`] never touches the network; the I/O half lives in
//! [`Driver`](crate::driver::Driver), which requires a `Dialect`.

pub mod mssql;
pub mod postgres;

pub use mssql::MsDialect;
pub use postgres::PgDialect;

use crate::query_builder::QueryBuilder;

/// Dialect-specific pieces of SQL text.
pub trait Dialect: Send + Sync {
    /// Short dialect label used in logs.
    fn name(&self) -> &'static str;

    /// Placeholder for the next value bound to `column`.
    ///
    /// Called before the value is recorded, so positional dialects can number from the
    /// builder's current bound-parameter count.
    fn parameter_name(&self, builder: &QueryBuilder<'_>, column: &str) -> String;

    /// Text inserted right after `SELECT`.
    fn pagination_prefix(&self, _builder: &QueryBuilder<'_>, sql: String) -> String {
        sql
    }

    /// Text appended after `ORDER BY`.
    fn pagination_suffix(&self, builder: &QueryBuilder<'_>, sql: String) -> String;
}

/// Render a column-definition list for `CREATE TABLE`.
///
/// Entries after a `--` marker are table options appended after the parenthesized list.
///
/// ```rust
/// use sql_bridge::dialect::table_definitions;
///
/// let sql = table_definitions(&["id INT", "name TEXT", "--", "WITH (DATA_COMPRESSION = PAGE)"]);
/// assert_eq!(sql, "(id INT, name TEXT) WITH (DATA_COMPRESSION = PAGE)");
/// ```
#[must_use]
pub fn table_definitions(definitions: &[&str]) -> String {
    let (columns, options) = match definitions.iter().position(|d| *d == "--") {
        Some(marker) => (&definitions[..marker], &definitions[marker + 1..]),
        None => (definitions, &[][..]),
    };

    let mut sql = String::new();
    if !columns.is_empty() {
        sql.push('(');
        sql.push_str(&columns.join(", "));
        sql.push(')');
    }
    if !options.is_empty() {
        if !sql.is_empty() {
            sql.push(' ');
        }
        sql.push_str(&options.join(" "));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::table_definitions;

    #[test]
    fn definitions_without_options() {
        assert_eq!(table_definitions(&["id INT"]), "(id INT)");
        assert_eq!(table_definitions(&[]), "");
    }

    #[test]
    fn options_follow_the_column_list() {
        assert_eq!(
            table_definitions(&["a INT", "b INT", "--", "TABLESPACE fast", "WITH (fillfactor=70)"]),
            "(a INT, b INT) TABLESPACE fast WITH (fillfactor=70)"
        );
    }
}
