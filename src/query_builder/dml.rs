use super::{Action, Filter, QueryBuilder};
use crate::record::Record;

impl QueryBuilder<'_> {
    /// `INSERT INTO table (c1, c2) VALUES (p1, p2)`.
    #[must_use]
    pub fn insert(mut self, table: impl Into<String>, record: Record) -> Self {
        let mut columns = Vec::with_capacity(record.len());
        let mut placeholders = Vec::with_capacity(record.len());
        for (column, value) in record.into_pairs() {
            let name = self.dialect.parameter_name(&self, &column);
            placeholders.push(name.clone());
            columns.push(column);
            self.bind(name, value);
        }
        self.line = Some(if columns.is_empty() {
            "DEFAULT VALUES".to_string()
        } else {
            format!(
                "({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        });
        self.action = Action::Insert;
        self.from(table, None)
    }

    /// `UPDATE table SET c1 = p1, ... WHERE ...`; SET values bind before filter values.
    #[must_use]
    pub fn update(
        mut self,
        table: impl Into<String>,
        record: Record,
        filter: impl Into<Filter>,
    ) -> Self {
        let mut assignments = Vec::with_capacity(record.len());
        for (column, value) in record.into_pairs() {
            let name = self.dialect.parameter_name(&self, &column);
            assignments.push(format!("{column} = {name}"));
            self.bind(name, value);
        }
        self.line = Some(assignments.join(", "));
        self.action = Action::Update;
        self.from(table, None).filter(filter)
    }

    #[must_use]
    pub fn delete(mut self, table: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.action = Action::Delete;
        self.from(table, None).filter(filter)
    }

    pub(super) fn build_insert(&self) -> String {
        format!(
            "INSERT INTO {} {}",
            self.table_name(),
            self.line.as_deref().unwrap_or_default()
        )
    }

    pub(super) fn build_update(&self) -> String {
        format!(
            "UPDATE {} SET {}{}",
            self.table_name(),
            self.line.as_deref().unwrap_or_default(),
            self.where_clause()
        )
    }

    pub(super) fn build_delete(&self) -> String {
        format!("DELETE FROM {}{}", self.table_name(), self.where_clause())
    }
}
