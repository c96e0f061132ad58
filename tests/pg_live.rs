#![cfg(feature = "postgres")]

//! Runs against a real server only when `SQL_BRIDGE_PG_DSN` is set, e.g.
//! `host=localhost user=postgres password=postgres dbname=postgres`.

use sql_bridge::PgDb;
use sql_bridge::prelude::*;

fn live_db() -> Option<PgDb> {
    match std::env::var("SQL_BRIDGE_PG_DSN") {
        Ok(dsn) if !dsn.trim().is_empty() => Some(Db::new(PgDriver, dsn)),
        _ => {
            eprintln!("SQL_BRIDGE_PG_DSN not set; skipping");
            None
        }
    }
}

fn table_name(prefix: &str) -> String {
    format!("{prefix}_{}", std::process::id())
}

#[test]
fn pg_table_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let users = table_name("bridge_users");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        assert!(db.drop(&users, true).await?);
        assert!(
            db.create(
                &users,
                &["id INT PRIMARY KEY", "name TEXT NOT NULL", "active BOOLEAN NOT NULL"],
                true,
            )
            .await?
        );
        assert!(db.exists(&users).await?);

        assert_eq!(db.insert(&users, record! { id: 1, name: "Ann", active: true }).await?, 1);
        assert_eq!(db.insert(&users, record! { id: 2, name: "Bo", active: false }).await?, 1);

        let active = db
            .find(&users, record! { active: true }, QueryOptions::default().limit(10))
            .await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active.results[0].try_get::<String>("name")?, "Ann");

        assert_eq!(
            db.update(&users, record! { name: "Bob" }, record! { id: 2 }).await?,
            1
        );
        let bob = db
            .first(&users, record! { id: 2 }, QueryOptions::default())
            .await?
            .expect("row 2");
        assert_eq!(bob.try_get::<String>("name")?, "Bob");

        assert_eq!(db.count(&users, (), QueryOptions::default()).await?, 2);
        assert_eq!(db.delete(&users, record! { active: false }).await?, 1);

        let mut reader = db
            .read(&users, (), QueryOptions::default().order("id"))
            .await?;
        let row = db.read_row(&mut reader).await?.expect("one row");
        assert_eq!(row.try_get::<i64>("id")?, 1);
        assert!(db.read_row(&mut reader).await?.is_none());
        reader.close();

        assert!(db.truncate(&users, true).await?);
        assert_eq!(db.count(&users, (), QueryOptions::default()).await?, 0);
        assert!(db.drop(&users, false).await?);
        assert!(!db.exists(&users).await?);
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn pg_bulk_insert_and_empty_copy() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let scores = table_name("bridge_scores");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        db.create(&scores, &["player INT", "points DOUBLE PRECISION", "note TEXT"], true)
            .await?;

        let mut table = TableData::new(scores.clone())
            .column("player", ColumnKind::Int)
            .column("points", ColumnKind::Float)
            .column("note", ColumnKind::Text);
        for i in 0..3 {
            table.push_row(vec![
                RowValues::Int(i),
                RowValues::Float(i as f64 * 1.5),
                if i == 1 { RowValues::Null } else { RowValues::Text(format!("n{i}")) },
            ])?;
        }
        assert_eq!(db.bulk_insert(&table).await?, 3);
        assert_eq!(db.count(&scores, (), QueryOptions::default()).await?, 3);

        table.rows.clear();
        assert_eq!(db.bulk_insert(&table).await?, 0);
        assert_eq!(db.count(&scores, (), QueryOptions::default()).await?, 3);

        let err = db
            .insert_via_procedure("load_scores", &table)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlBridgeError::UnsupportedOperation(_)));

        db.drop(&scores, true).await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn pg_functions_and_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let ledger = table_name("bridge_ledger");
    let function = table_name("bridge_double");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        assert!(
            db.try_run(
                &format!(
                    "CREATE OR REPLACE FUNCTION {function}(x INT) RETURNS INT \
                     AS $$ SELECT x * 2 $$ LANGUAGE SQL"
                ),
                (),
            )
            .await?
        );
        let doubled: i64 = db.fn_scalar(&function, record! { x: 21 }).await?;
        assert_eq!(doubled, 42);

        db.create(&ledger, &["id INT", "amount INT"], true).await?;
        let mut conn = db.connect().await?;
        conn.begin().await?;
        let insert = db.command(
            &format!("INSERT INTO {ledger} (id, amount) VALUES (@id, @amount)"),
            CommandKind::Text,
            record! { id: 1, amount: 100 },
        );
        db.run_with(&mut conn, insert, ResultMode::Affected).await?;
        conn.rollback().await?;
        conn.close().await?;
        assert_eq!(db.count(&ledger, (), QueryOptions::default()).await?, 0);

        assert!(!db.try_run("SELEC nonsense", ()).await?);

        db.drop(&ledger, true).await?;
        db.try_run(&format!("DROP FUNCTION IF EXISTS {function}(INT)"), ())
            .await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn pg_numeric_columns_read_and_bind() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let prices = table_name("bridge_prices");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        db.create(&prices, &["id INT", "price NUMERIC(10,2)"], true).await?;
        assert_eq!(db.insert(&prices, record! { id: 1, price: 9.5 }).await?, 1);
        assert_eq!(db.insert(&prices, record! { id: 2, price: 3 }).await?, 1);

        let rows = db
            .find(&prices, (), QueryOptions::default().order("id"))
            .await?;
        assert_eq!(rows.results[0].get("price"), Some(&RowValues::Float(9.5)));
        assert_eq!(rows.results[1].get("price"), Some(&RowValues::Int(3)));

        // sum over int8 is NUMERIC on the server
        let total: i64 = db
            .query_scalar(&format!("SELECT sum(id::int8) FROM {prices}"), ())
            .await?;
        assert_eq!(total, 3);
        let half: f64 = db.query_scalar("SELECT 1.5::numeric", ()).await?;
        assert!((half - 1.5).abs() < f64::EPSILON);

        db.drop(&prices, true).await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn pg_privilege_errors_are_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let dsn = std::env::var("SQL_BRIDGE_PG_DSN")?;
    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        eprintln!("URL-style DSN; skipping");
        return Ok(());
    }
    let owned = table_name("bridge_owned");
    let role = table_name("bridge_low");
    let password = format!("pw{}", std::process::id());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if !db
            .try_run(&format!("CREATE ROLE {role} LOGIN PASSWORD '{password}'"), ())
            .await?
        {
            eprintln!("cannot create roles; skipping");
            return Ok(());
        }
        db.create(&owned, &["id INT"], true).await?;

        let low = Db::new(PgDriver, format!("{dsn} user={role} password={password}"));
        let denied = low
            .try_run(&format!("INSERT INTO {owned} (id) VALUES (1)"), ())
            .await;
        let err = denied.unwrap_err();
        assert!(PgDriver.is_fatal_error(&err));
        // ordinary failures are still reported as false
        assert!(!low.try_run("SELEC nonsense", ()).await?);

        db.drop(&owned, true).await?;
        db.try_run(&format!("DROP ROLE {role}"), ()).await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}
