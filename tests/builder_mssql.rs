#![cfg(feature = "mssql")]

use sql_bridge::prelude::*;

#[test]
fn insert_lists_columns_and_named_placeholders() -> Result<(), SqlBridgeError> {
    let driver = MssqlDriver;
    let stmt = QueryBuilder::new(&driver)
        .insert("users", record! { name: "Ann", age: 30 })
        .statement()?;
    assert_eq!(stmt.sql, "INSERT INTO users (name, age) VALUES (@name, @age)");
    assert_eq!(
        stmt.params,
        vec![
            ("@name".to_string(), RowValues::from("Ann")),
            ("@age".to_string(), RowValues::Int(30)),
        ]
    );
    assert!(!stmt.scalar);
    Ok(())
}

#[test]
fn update_binds_set_values_before_filters() -> Result<(), SqlBridgeError> {
    let driver = MssqlDriver;
    let stmt = QueryBuilder::new(&driver)
        .update("users", record! { name: "Bo" }, record! { id: 7 })
        .statement()?;
    assert_eq!(stmt.sql, "UPDATE users SET name = @name WHERE id = @id");
    assert_eq!(stmt.params[0].0, "@name");
    assert_eq!(stmt.params[1].0, "@id");
    Ok(())
}

#[test]
fn pagination_uses_top_or_offset_fetch() {
    let driver = MssqlDriver;
    let top = QueryBuilder::new(&driver).from("t", None).limit(5);
    assert_eq!(top.sql(), "SELECT TOP 5 * FROM t");

    let page = QueryBuilder::new(&driver)
        .from("t", None)
        .order_by("id")
        .limit_offset(5, 10);
    assert_eq!(
        page.sql(),
        "SELECT * FROM t ORDER BY id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn offset_set_before_limit_still_pages() {
    let driver = MssqlDriver;
    let page = QueryBuilder::new(&driver)
        .from("t", None)
        .order_by("id")
        .offset(10)
        .limit(5);
    assert_eq!(
        page.sql(),
        "SELECT * FROM t ORDER BY id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn same_column_twice_is_a_parameter_error() {
    let driver = MssqlDriver;
    let result = QueryBuilder::new(&driver)
        .from("t", None)
        .and_where("id", 1)
        .or_where("id", 2)
        .statement();
    assert!(matches!(result, Err(SqlBridgeError::ParameterError(_))));
}

#[test]
fn delete_without_table_fails_to_build() {
    let driver = MssqlDriver;
    let result = QueryBuilder::new(&driver).delete("", record! { id: 1 }).statement();
    assert!(matches!(result, Err(SqlBridgeError::QueryBuildError(_))));
}
