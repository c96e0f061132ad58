use tiberius::Query;

use crate::types::RowValues;

/// Bind values to `query` in order; the n-th value fills `@Pn`.
///
/// Timestamps bind as `datetime2` and JSON as its text.
pub fn bind_query_params<'a>(query: &mut Query<'a>, params: impl IntoIterator<Item = RowValues>) {
    for param in params {
        match param {
            RowValues::Int(i) => query.bind(i),
            RowValues::Float(f) => query.bind(f),
            RowValues::Text(s) => query.bind(s),
            RowValues::Bool(b) => query.bind(b),
            RowValues::Timestamp(dt) => query.bind(dt),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes),
        }
    }
}

/// Build a bound query from owned SQL.
pub fn bound_query(sql: String, params: impl IntoIterator<Item = RowValues>) -> Query<'static> {
    let mut query = Query::new(sql);
    bind_query_params(&mut query, params);
    query
}
