//! Lazily compiled SQL assembly for the engine's table, finder and function helpers.
//!
//! Builders are created from a [`Dialect`] and consumed by value:
//! ```rust
//! use sql_bridge::dialect::PgDialect;
//! use sql_bridge::query_builder::{QueryBuilder, QueryOptions};
//! use sql_bridge::record;
//!
//! let qb = QueryBuilder::new(&PgDialect).find(
//!     "users",
//!     record! { active: true },
//!     QueryOptions::default().limit(10),
//! );
//! assert_eq!(qb.sql(), "SELECT * FROM users WHERE active = $1 LIMIT 10");
//! ```

use std::cell::OnceCell;
use std::fmt;

use crate::dialect::Dialect;
use crate::error::SqlBridgeError;
use crate::record::Record;
use crate::types::RowValues;

mod dml;
mod select;

/// Statement kind the builder compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Function,
}

/// Leading conjunction of a filter fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        })
    }
}

/// Filter argument for finders, updates and deletes.
///
/// A record ANDs one equality predicate per field; a bare `bool` only sets the builder's
/// scalar flag.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Fields(Record),
    Scalar(bool),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Fields(Record::Null)
    }
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Filter::Fields(record)
    }
}

impl From<bool> for Filter {
    fn from(scalar: bool) -> Self {
        Filter::Scalar(scalar)
    }
}

impl From<()> for Filter {
    fn from((): ()) -> Self {
        Filter::default()
    }
}

/// Optional SELECT parts accepted by finders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub columns: Option<String>,
    pub alias: Option<String>,
    pub order: Option<String>,
    pub group: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryOptions {
    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A validated, compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    /// `(placeholder, value)` pairs in binding order.
    pub params: Vec<(String, RowValues)>,
    pub scalar: bool,
}

/// Stateful SQL assembler.
///
/// Compilation happens on the first call to [`sql`](QueryBuilder::sql); the result is
/// memoized and later part changes do not alter it.
pub struct QueryBuilder<'d> {
    dialect: &'d dyn Dialect,
    action: Action,
    table: Option<String>,
    columns: Option<String>,
    alias: Option<String>,
    order: Option<String>,
    group: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    line: Option<String>,
    filters: Vec<String>,
    arguments: Vec<String>,
    params: Vec<(String, RowValues)>,
    scalar: Option<bool>,
    sql: OnceCell<String>,
}

impl fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.name())
            .field("action", &self.action)
            .field("table", &self.table)
            .field("filters", &self.filters)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<'d> QueryBuilder<'d> {
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            action: Action::default(),
            table: None,
            columns: None,
            alias: None,
            order: None,
            group: None,
            limit: None,
            offset: None,
            line: None,
            filters: Vec::new(),
            arguments: Vec::new(),
            params: Vec::new(),
            scalar: None,
            sql: OnceCell::new(),
        }
    }

    /// Number of values bound so far.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.params.len()
    }

    /// Limit, when one greater than zero is set.
    #[must_use]
    pub fn limit_value(&self) -> Option<u64> {
        self.limit.filter(|l| *l > 0)
    }

    /// Offset, when one greater than zero is set.
    #[must_use]
    pub fn offset_value(&self) -> Option<u64> {
        self.offset.filter(|o| *o > 0)
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Bound `(placeholder, value)` pairs in binding order.
    #[must_use]
    pub fn params(&self) -> &[(String, RowValues)] {
        &self.params
    }

    /// Explicit scalar flag if set, otherwise true only for SELECT.
    #[must_use]
    pub fn scalar(&self) -> bool {
        self.scalar.unwrap_or(self.action == Action::Select)
    }

    /// Override the scalar flag.
    #[must_use]
    pub fn scalar_query(mut self, scalar: bool) -> Self {
        self.scalar = Some(scalar);
        self
    }

    /// Compiled SQL text.
    pub fn sql(&self) -> &str {
        self.sql.get_or_init(|| self.compile())
    }

    /// Validate and hand over the compiled statement.
    ///
    /// # Errors
    /// `QueryBuildError` when no table or function name was given, `ParameterError` when
    /// the same placeholder was bound twice.
    pub fn statement(self) -> Result<Statement, SqlBridgeError> {
        if self.table.as_deref().is_none_or(str::is_empty) {
            return Err(SqlBridgeError::QueryBuildError(
                "no table or function name given".to_string(),
            ));
        }
        for (i, (name, _)) in self.params.iter().enumerate() {
            if self.params[..i]
                .iter()
                .any(|(seen, _)| seen.eq_ignore_ascii_case(name))
            {
                return Err(SqlBridgeError::ParameterError(format!(
                    "placeholder {name} is bound more than once"
                )));
            }
        }
        let scalar = self.scalar();
        let sql = self.sql().to_string();
        Ok(Statement {
            sql,
            params: self.params,
            scalar,
        })
    }

    fn bind(&mut self, name: String, value: RowValues) {
        self.params.push((name, value));
    }

    fn compile(&self) -> String {
        match self.action {
            Action::Insert => self.build_insert(),
            Action::Update => self.build_update(),
            Action::Delete => self.build_delete(),
            Action::Select | Action::Function => self.build_select(),
        }
    }

    fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or_default()
    }

    fn where_clause(&self) -> String {
        let criteria = self.filters.join(" ");
        match criteria.split_once(' ') {
            Some((_, rest)) if !rest.trim().is_empty() => format!(" WHERE {}", rest.trim()),
            _ => String::new(),
        }
    }
}
