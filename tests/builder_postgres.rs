#![cfg(feature = "postgres")]

use sql_bridge::prelude::*;

#[test]
fn find_with_limit_numbers_placeholders() -> Result<(), SqlBridgeError> {
    let driver = PgDriver;
    let stmt = QueryBuilder::new(&driver)
        .find("users", record! { active: true }, QueryOptions::default().limit(10))
        .statement()?;
    assert_eq!(stmt.sql, "SELECT * FROM users WHERE active = $1 LIMIT 10");
    assert_eq!(stmt.params, vec![("$1".to_string(), RowValues::Bool(true))]);
    assert!(stmt.scalar);
    Ok(())
}

#[test]
fn placeholders_follow_binding_order_across_clauses() -> Result<(), SqlBridgeError> {
    let driver = PgDriver;
    let stmt = QueryBuilder::new(&driver)
        .update(
            "users",
            record! { name: "Ann", age: 31 },
            record! { id: 4, tenant: "acme" },
        )
        .statement()?;
    assert_eq!(
        stmt.sql,
        "UPDATE users SET name = $1, age = $2 WHERE id = $3 AND tenant = $4"
    );
    let names: Vec<_> = stmt.params.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["$1", "$2", "$3", "$4"]);
    Ok(())
}

#[test]
fn limit_and_offset_are_independent() {
    let driver = PgDriver;
    let both = QueryBuilder::new(&driver).from("t", None).limit_offset(5, 10);
    assert_eq!(both.sql(), "SELECT * FROM t LIMIT 5 OFFSET 10");

    let offset = QueryBuilder::new(&driver).from("t", None).offset(10);
    assert_eq!(offset.sql(), "SELECT * FROM t OFFSET 10");
}

#[test]
fn limit_after_offset_keeps_the_offset() {
    let driver = PgDriver;
    let qb = QueryBuilder::new(&driver).from("t", None).offset(10).limit(5);
    assert_eq!(qb.sql(), "SELECT * FROM t LIMIT 5 OFFSET 10");
}

#[test]
fn compiled_sql_is_memoized() {
    let driver = PgDriver;
    let qb = QueryBuilder::new(&driver).from("t", None).and_where("a", 1);
    let first = qb.sql().to_string();
    let qb = qb.and_where("b", 2).limit(3);
    assert_eq!(qb.sql(), first);
}

#[test]
fn functions_take_positional_arguments() {
    let driver = PgDriver;
    let qb = QueryBuilder::new(&driver).call_function(
        "top_players",
        record! { season: 2024, region: "eu" },
        false,
    );
    assert_eq!(qb.sql(), "SELECT * FROM top_players($1, $2)");
    assert!(!qb.scalar());
}
