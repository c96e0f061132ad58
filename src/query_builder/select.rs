use super::{Action, Conjunction, Filter, QueryBuilder, QueryOptions};
use crate::record::Record;
use crate::types::RowValues;

impl QueryBuilder<'_> {
    /// Column list; defaults to `*`.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.join(", "));
        self
    }

    #[must_use]
    pub fn from(mut self, table: impl Into<String>, alias: Option<&str>) -> Self {
        self.table = Some(table.into());
        self.alias = alias.map(str::to_string);
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Apply a record filter or a scalar flag.
    #[must_use]
    pub fn filter(self, filter: impl Into<Filter>) -> Self {
        match filter.into() {
            Filter::Scalar(scalar) => self.scalar_query(scalar),
            Filter::Fields(record) => record
                .into_pairs()
                .into_iter()
                .fold(self, |qb, (column, value)| qb.and_where(column, value)),
        }
    }

    /// Add `<conjunction> <column> <operator> <placeholder>`.
    #[must_use]
    pub fn where_op(
        mut self,
        column: impl AsRef<str>,
        operator: &str,
        value: impl Into<RowValues>,
        conjunction: Conjunction,
    ) -> Self {
        let column = column.as_ref();
        let name = self.dialect.parameter_name(&self, column);
        self.filters
            .push(format!("{conjunction} {column} {operator} {name}"));
        self.bind(name, value.into());
        self
    }

    #[must_use]
    pub fn and_where(self, column: impl AsRef<str>, value: impl Into<RowValues>) -> Self {
        self.where_op(column, "=", value, Conjunction::And)
    }

    #[must_use]
    pub fn or_where(self, column: impl AsRef<str>, value: impl Into<RowValues>) -> Self {
        self.where_op(column, "=", value, Conjunction::Or)
    }

    #[must_use]
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn group_by(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn limit(self, limit: u64) -> Self {
        self.limit_offset(limit, 0)
    }

    /// Set the limit; the offset is only replaced when greater than zero.
    #[must_use]
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> Self {
        if offset > 0 {
            self.offset = Some(offset);
        }
        self.limit = Some(limit);
        self
    }

    /// Overwrite the parts present in `options`.
    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        let QueryOptions {
            columns,
            alias,
            order,
            group,
            limit,
            offset,
        } = options;
        self.columns = columns.or(self.columns);
        self.alias = alias.or(self.alias);
        self.order = order.or(self.order);
        self.group = group.or(self.group);
        self.limit = limit.or(self.limit);
        self.offset = offset.or(self.offset);
        self
    }

    #[must_use]
    pub fn find(self, table: impl Into<String>, filter: impl Into<Filter>, options: QueryOptions) -> Self {
        self.from(table, None).filter(filter).options(options)
    }

    /// [`find`](Self::find) limited to one row.
    #[must_use]
    pub fn first(self, table: impl Into<String>, filter: impl Into<Filter>, options: QueryOptions) -> Self {
        self.find(table, filter, options).limit(1)
    }

    /// `SELECT * FROM name(p1, p2)` with one positional argument per record field.
    #[must_use]
    pub fn call_function(mut self, name: impl Into<String>, args: Record, scalar: bool) -> Self {
        for (key, value) in args.into_pairs() {
            let placeholder = self.dialect.parameter_name(&self, &key);
            self.arguments.push(placeholder.clone());
            self.bind(placeholder, value);
        }
        self.action = Action::Function;
        self.from(name, None).scalar_query(scalar)
    }

    pub(super) fn build_select(&self) -> String {
        let mut sql = self.dialect.pagination_prefix(self, "SELECT".to_string());

        sql.push(' ');
        sql.push_str(self.columns.as_deref().filter(|c| !c.is_empty()).unwrap_or("*"));
        sql.push_str(" FROM ");
        sql.push_str(self.table_name());

        if self.action == Action::Function {
            sql.push('(');
            sql.push_str(&self.arguments.join(", "));
            sql.push(')');
        }

        if let Some(alias) = self.alias.as_deref().filter(|a| !a.is_empty()) {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }

        if self.action != Action::Function {
            sql.push_str(&self.where_clause());
        }

        if let Some(group) = self.group.as_deref().filter(|g| !g.is_empty()) {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }

        if let Some(order) = self.order.as_deref().filter(|o| !o.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        self.dialect.pagination_suffix(self, sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MsDialect, PgDialect};
    use crate::record;

    #[test]
    fn record_filter_ands_equality_predicates() {
        let qb = QueryBuilder::new(&MsDialect)
            .find("users", record! { name: "Ann", age: 30 }, QueryOptions::default());
        assert_eq!(qb.sql(), "SELECT * FROM users WHERE name = @name AND age = @age");
        assert_eq!(qb.params().len(), 2);
    }

    #[test]
    fn mixed_conjunctions_keep_insertion_order() {
        let qb = QueryBuilder::new(&PgDialect)
            .from("t", Some("x"))
            .and_where("a", 1)
            .or_where("b", 2)
            .where_op("c", ">=", 3, Conjunction::And);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM t AS x WHERE a = $1 OR b = $2 AND c >= $3"
        );
    }

    #[test]
    fn bool_filter_only_sets_scalar_flag() {
        let qb = QueryBuilder::new(&PgDialect).find("t", false, QueryOptions::default());
        assert!(!qb.scalar());
        assert_eq!(qb.sql(), "SELECT * FROM t");
    }

    #[test]
    fn select_part_order() {
        let qb = QueryBuilder::new(&PgDialect)
            .select(&["dept", "count(*) AS n"])
            .from("staff", None)
            .and_where("active", true)
            .group_by("dept")
            .order_by("n DESC")
            .limit_offset(5, 10);
        assert_eq!(
            qb.sql(),
            "SELECT dept, count(*) AS n FROM staff WHERE active = $1 GROUP BY dept ORDER BY n DESC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn ms_pagination_variants() {
        let top = QueryBuilder::new(&MsDialect).from("t", None).limit(5);
        assert_eq!(top.sql(), "SELECT TOP 5 * FROM t");

        let page = QueryBuilder::new(&MsDialect)
            .from("t", None)
            .order_by("id")
            .limit_offset(5, 10);
        assert_eq!(
            page.sql(),
            "SELECT * FROM t ORDER BY id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );

        let offset_only = QueryBuilder::new(&MsDialect).from("t", None).offset(3);
        assert_eq!(offset_only.sql(), "SELECT * FROM t");
    }

    #[test]
    fn zero_limit_is_ignored() {
        let qb = QueryBuilder::new(&PgDialect).from("t", None).limit(0).offset(0);
        assert_eq!(qb.sql(), "SELECT * FROM t");
    }

    #[test]
    fn first_limits_to_one_row() {
        let qb = QueryBuilder::new(&MsDialect).first(
            "users",
            record! { id: 7 },
            QueryOptions::default().columns("name"),
        );
        assert_eq!(qb.sql(), "SELECT TOP 1 name FROM users WHERE id = @id");
    }

    #[test]
    fn function_call_places_arguments_after_the_name() {
        let qb = QueryBuilder::new(&PgDialect)
            .call_function("fn_scores", record! { player: 3, season: 2024 }, true)
            .limit(2);
        assert_eq!(qb.sql(), "SELECT * FROM fn_scores($1, $2) LIMIT 2");
        assert!(qb.scalar());

        let qb = QueryBuilder::new(&MsDialect).call_function("dbo.fn_now", Record::Null, false);
        assert_eq!(qb.sql(), "SELECT * FROM dbo.fn_now()");
        assert!(!qb.scalar());
    }

    #[test]
    fn compiled_sql_is_memoized() {
        let qb = QueryBuilder::new(&PgDialect).from("t", None);
        let first = qb.sql().to_string();
        let qb = qb.and_where("a", 1).limit(3);
        assert_eq!(qb.sql(), first);
        assert_eq!(qb.sql(), "SELECT * FROM t");
    }
}
