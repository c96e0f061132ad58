use std::pin::pin;

use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};

use super::connection::PgConnection;
use crate::driver::{ColumnKind, TableData};
use crate::error::SqlBridgeError;

pub(crate) fn copy_type(kind: ColumnKind) -> Type {
    match kind {
        ColumnKind::Int => Type::INT4,
        ColumnKind::BigInt => Type::INT8,
        ColumnKind::Float => Type::FLOAT8,
        ColumnKind::Text => Type::TEXT,
        ColumnKind::Bool => Type::BOOL,
        ColumnKind::Timestamp => Type::TIMESTAMP,
        ColumnKind::Json => Type::JSONB,
        ColumnKind::Blob => Type::BYTEA,
    }
}

pub(crate) fn copy_statement(table: &TableData) -> String {
    format!(
        "COPY {} ({}) FROM STDIN (FORMAT BINARY)",
        table.name,
        table.column_list()
    )
}

/// Stream `table` through binary `COPY` inside one transaction.
///
/// The stream is only finished when a row was written; an empty table opens and abandons
/// it. Dropping the transaction on any error rolls it back.
pub(crate) async fn copy_in(
    conn: &mut PgConnection,
    table: &TableData,
) -> Result<u64, SqlBridgeError> {
    table.validate()?;
    let types: Vec<Type> = table.columns.iter().map(|c| copy_type(c.kind)).collect();
    let tx = conn.client.transaction().await?;
    let sink = tx.copy_in(copy_statement(table).as_str()).await?;
    let written = {
        let mut writer = pin!(BinaryCopyInWriter::new(sink, &types));
        let mut written = 0u64;
        for row in &table.rows {
            let values: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            writer.as_mut().write(&values).await?;
            written += 1;
        }
        if written > 0 {
            writer.as_mut().finish().await?
        } else {
            0
        }
    };
    tx.commit().await?;
    Ok(written)
}
