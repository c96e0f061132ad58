#![cfg(feature = "mssql")]

//! Runs against a real server only when `SQL_BRIDGE_MSSQL_DSN` is set, e.g.
//! `server=tcp:localhost,1433;user id=sa;password=...;TrustServerCertificate=true`.

use sql_bridge::MssqlDb;
use sql_bridge::prelude::*;

fn live_db() -> Option<MssqlDb> {
    match std::env::var("SQL_BRIDGE_MSSQL_DSN") {
        Ok(dsn) if !dsn.trim().is_empty() => Some(Db::new(MssqlDriver, dsn)),
        _ => {
            eprintln!("SQL_BRIDGE_MSSQL_DSN not set; skipping");
            None
        }
    }
}

fn table_name(prefix: &str) -> String {
    format!("{prefix}_{}", std::process::id())
}

#[test]
fn mssql_table_round_trip() -> Result<(), Box<dyn std::error::Error>> {
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
                &["id INT PRIMARY KEY", "name NVARCHAR(50) NOT NULL", "age INT NULL"],
                true,
            )
            .await?
        );
        assert!(db.exists(&users).await?);

        assert_eq!(db.insert(&users, record! { id: 1, name: "Ann", age: 30 }).await?, 1);
        assert_eq!(db.insert(&users, record! { id: 2, name: "Bo", age: RowValues::Null }).await?, 1);

        let top = db
            .find(&users, (), QueryOptions::default().order("id").limit(1))
            .await?;
        assert_eq!(top.len(), 1);
        assert_eq!(top.results[0].try_get::<i64>("age")?, 30);

        let page = db
            .find(&users, (), QueryOptions::default().order("id").limit(5).offset(1))
            .await?;
        assert_eq!(page.len(), 1);
        assert_eq!(page.results[0].try_get::<Option<i64>>("age")?, None);

        assert_eq!(db.count(&users, (), QueryOptions::default()).await?, 2);
        assert_eq!(db.delete(&users, record! { id: 2 }).await?, 1);

        assert!(matches!(
            db.truncate(&users, true).await,
            Err(SqlBridgeError::UnsupportedOperation(_))
        ));
        assert!(db.truncate(&users, false).await?);
        assert!(db.drop(&users, false).await?);
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn mssql_procedures_bulk_and_table_valued() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let scores = table_name("bridge_scores");
    let row_type = table_name("bridge_score_rows");
    let load = table_name("bridge_load_scores");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        db.create(&scores, &["player INT", "points FLOAT"], true).await?;

        let mut table = TableData::new(scores.clone())
            .column("player", ColumnKind::Int)
            .column("points", ColumnKind::Float);
        table.push_row(vec![RowValues::Int(1), RowValues::Float(9.5)])?;
        table.push_row(vec![RowValues::Int(2), RowValues::Null])?;
        assert_eq!(db.bulk_insert(&table).await?, 2);
        assert_eq!(db.count(&scores, (), QueryOptions::default()).await?, 2);

        db.try_run(&format!("CREATE TYPE {row_type} AS TABLE (player INT, points FLOAT)"), ())
            .await?;
        db.try_run(
            &format!(
                "CREATE PROCEDURE {load} @{scores} {row_type} READONLY AS \
                 BEGIN INSERT INTO {scores} SELECT player, points FROM @{scores}; RETURN @@ROWCOUNT; END"
            ),
            (),
        )
        .await?;
        assert_eq!(db.insert_via_procedure(&load, &table).await?, 2);
        assert_eq!(db.count(&scores, (), QueryOptions::default()).await?, 4);

        let best: f64 = db
            .query_scalar(
                &format!("SELECT MAX(points) FROM {scores} WHERE player = @player"),
                record! { player: 1 },
            )
            .await?;
        assert!((best - 9.5).abs() < f64::EPSILON);

        db.try_run(&format!("DROP PROCEDURE {load}"), ()).await?;
        db.try_run(&format!("DROP TYPE {row_type}"), ()).await?;
        db.drop(&scores, true).await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}

#[test]
fn mssql_bulk_insert_skips_identity_columns() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_db() else {
        return Ok(());
    };
    let entries = table_name("bridge_entries");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        db.create(
            &entries,
            &[
                "id INT IDENTITY(1,1) PRIMARY KEY",
                "player INT NOT NULL",
                "note NVARCHAR(20) NULL",
                "points FLOAT NULL",
            ],
            true,
        )
        .await?;

        let mut table = TableData::new(entries.clone())
            .column("points", ColumnKind::Float)
            .column("player", ColumnKind::Int);
        table.push_row(vec![RowValues::Float(1.5), RowValues::Int(7)])?;
        table.push_row(vec![RowValues::Null, RowValues::Int(8)])?;
        assert_eq!(db.bulk_insert(&table).await?, 2);

        let rows = db
            .find(&entries, (), QueryOptions::default().order("id"))
            .await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.results[0].try_get::<i64>("id")?, 1);
        assert_eq!(rows.results[1].try_get::<i64>("player")?, 8);
        assert_eq!(rows.results[1].try_get::<Option<String>>("note")?, None);

        let with_id = TableData::new(entries.clone()).column("id", ColumnKind::Int);
        assert!(matches!(
            db.bulk_insert(&with_id).await,
            Err(SqlBridgeError::ParameterError(_))
        ));

        db.drop(&entries, true).await?;
        Ok::<(), SqlBridgeError>(())
    })?;
    Ok(())
}
