use std::borrow::Cow;

use tiberius::{ColumnData, ColumnType, IntoSql, TokenRow};

use super::connection::MssqlConnection;
use super::params::bound_query;
use super::query::{build_result_set, last_result_value};
use crate::driver::{ColumnKind, TableData};
use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// SQL Server rejects a `VALUES` list longer than this.
const MAX_VALUES_ROWS: usize = 1000;
/// Parameters allowed in one request.
const MAX_PARAMS: usize = 2099;

fn bulk_error(table: &TableData, column: &str, value: &RowValues, kind: ColumnKind) -> SqlBridgeError {
    SqlBridgeError::ParameterError(format!(
        "{}.{column}: cannot load a {} value into a {kind:?} column",
        table.name,
        value.kind()
    ))
}

/// Wire value for one bulk-load cell, chosen by the declared column kind.
fn column_data(
    table: &TableData,
    column: &str,
    kind: ColumnKind,
    value: &RowValues,
) -> Result<ColumnData<'static>, SqlBridgeError> {
    let null = value.is_null();
    let mismatch = || bulk_error(table, column, value, kind);
    let data = match kind {
        ColumnKind::Int => ColumnData::I32(if null {
            None
        } else {
            let v = value.as_int().ok_or_else(mismatch)?;
            Some(i32::try_from(*v).map_err(|_| mismatch())?)
        }),
        ColumnKind::BigInt => ColumnData::I64(if null {
            None
        } else {
            Some(*value.as_int().ok_or_else(mismatch)?)
        }),
        ColumnKind::Float => ColumnData::F64(if null {
            None
        } else {
            Some(value.as_float().ok_or_else(mismatch)?)
        }),
        ColumnKind::Text => ColumnData::String(match value {
            RowValues::Null => None,
            RowValues::Text(s) => Some(Cow::Owned(s.clone())),
            _ => return Err(mismatch()),
        }),
        ColumnKind::Json => ColumnData::String(match value {
            RowValues::Null => None,
            RowValues::Text(s) => Some(Cow::Owned(s.clone())),
            RowValues::JSON(v) => Some(Cow::Owned(v.to_string())),
            _ => return Err(mismatch()),
        }),
        ColumnKind::Bool => ColumnData::Bit(if null {
            None
        } else {
            Some(*value.as_bool().ok_or_else(mismatch)?)
        }),
        ColumnKind::Timestamp => {
            if null {
                Option::<chrono::NaiveDateTime>::None.into_sql()
            } else {
                value.as_timestamp().ok_or_else(mismatch)?.into_sql()
            }
        }
        ColumnKind::Blob => ColumnData::Binary(if null {
            None
        } else {
            Some(Cow::Owned(value.as_blob().ok_or_else(mismatch)?.to_vec()))
        }),
    };
    Ok(data)
}

/// A column of the target table as the server reports it.
#[derive(Debug, Clone)]
struct ServerColumn {
    name: String,
    ty: ColumnType,
    /// False for identity, computed and rowversion columns, which the bulk
    /// insert skips.
    writable: bool,
    nullable: bool,
}

/// Source of one bulk-load cell.
#[derive(Debug, Clone)]
enum Slot {
    /// Ordinal of the `TableData` column.
    Value(usize),
    /// Writable column the table does not carry.
    Null(ColumnData<'static>),
}

/// Typed NULL for a nullable server column of type `ty`.
///
/// Nullable fixed-width columns travel as their variable-length form (`int` as
/// `intn`), so each width maps to the same NULL cell.
fn null_cell(ty: ColumnType) -> Option<ColumnData<'static>> {
    let cell = match ty {
        ColumnType::Int1 | ColumnType::Int2 | ColumnType::Int4 | ColumnType::Int8 | ColumnType::Intn => {
            ColumnData::I32(None)
        }
        ColumnType::Bit | ColumnType::Bitn => ColumnData::Bit(None),
        ColumnType::Float4 | ColumnType::Float8 | ColumnType::Floatn => ColumnData::F64(None),
        ColumnType::Decimaln | ColumnType::Numericn => ColumnData::Numeric(None),
        ColumnType::Datetime | ColumnType::Datetime4 | ColumnType::Datetimen => {
            ColumnData::DateTime(None)
        }
        ColumnType::Daten => ColumnData::Date(None),
        ColumnType::Datetime2 => ColumnData::DateTime2(None),
        ColumnType::Guid => ColumnData::Guid(None),
        ColumnType::NVarchar
        | ColumnType::NChar
        | ColumnType::BigVarChar
        | ColumnType::BigChar => ColumnData::String(None),
        ColumnType::BigVarBin | ColumnType::BigBinary => ColumnData::Binary(None),
        _ => return None,
    };
    Some(cell)
}

/// One slot per writable server column, in server order.
fn column_order(table: &TableData, server: &[ServerColumn]) -> Result<Vec<Slot>, SqlBridgeError> {
    for column in &table.columns {
        let target = server
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&column.name));
        match target {
            Some(c) if c.writable => {}
            Some(_) => {
                return Err(SqlBridgeError::ParameterError(format!(
                    "{}.{} is an identity or computed column and cannot be bulk loaded",
                    table.name, column.name
                )));
            }
            None => {
                return Err(SqlBridgeError::ParameterError(format!(
                    "server table {} has no column {}",
                    table.name, column.name
                )));
            }
        }
    }

    server
        .iter()
        .filter(|c| c.writable)
        .map(|c| match table.column_index(&c.name) {
            Some(idx) => Ok(Slot::Value(idx)),
            None => null_cell(c.ty).filter(|_| c.nullable).map(Slot::Null).ok_or_else(|| {
                SqlBridgeError::ParameterError(format!(
                    "table {} has no value for required column {}",
                    table.name, c.name
                ))
            }),
        })
        .collect()
}

/// Catalog flags per column name as `(name, writable, nullable)`; empty when the
/// catalog does not see the table.
async fn column_flags(
    conn: &mut MssqlConnection,
    table: &TableData,
) -> Result<Vec<(String, bool, bool)>, SqlBridgeError> {
    let sql = "SELECT c.name AS name, CAST(CASE WHEN c.is_identity = 1 OR c.is_computed = 1 \
               OR c.system_type_id = 189 THEN 0 ELSE 1 END AS BIT) AS writable, \
               c.is_nullable AS nullable \
               FROM sys.columns c WHERE c.object_id = OBJECT_ID(@P1) ORDER BY c.column_id";
    let query = bound_query(sql.to_string(), [RowValues::from(table.name.as_str())]);
    let stream = query.query(&mut conn.client).await?;
    let found = build_result_set(stream).await?;
    found
        .results
        .iter()
        .map(|row| {
            Ok((
                row.try_get::<String>("name")?,
                row.try_get::<bool>("writable")?,
                row.try_get::<bool>("nullable")?,
            ))
        })
        .collect()
}

async fn server_columns(
    conn: &mut MssqlConnection,
    table: &TableData,
) -> Result<Vec<ServerColumn>, SqlBridgeError> {
    // takes the table lock for the transaction and reads the server's column order
    let lock_sql = format!("SELECT TOP (0) * FROM {} WITH (TABLOCK, HOLDLOCK)", table.name);
    let mut stream = conn.client.query(lock_sql, &[]).await?;
    let typed: Vec<(String, ColumnType)> = stream
        .columns()
        .await?
        .map(|cols| {
            cols.iter()
                .map(|col| (col.name().to_string(), col.column_type()))
                .collect()
        })
        .unwrap_or_default();
    stream.into_results().await?;

    let flags = column_flags(conn, table).await?;
    Ok(typed
        .into_iter()
        .map(|(name, ty)| {
            let (writable, nullable) = flags
                .iter()
                .find(|(flagged, ..)| flagged.eq_ignore_ascii_case(&name))
                .map_or((true, true), |(_, writable, nullable)| (*writable, *nullable));
            ServerColumn {
                name,
                ty,
                writable,
                nullable,
            }
        })
        .collect())
}

async fn load(conn: &mut MssqlConnection, table: &TableData) -> Result<u64, SqlBridgeError> {
    let server = server_columns(conn, table).await?;
    let order = column_order(table, &server)?;

    let mut request = conn.client.bulk_insert(&table.name).await?;
    for row in &table.rows {
        let mut token_row = TokenRow::new();
        for slot in &order {
            let cell = match slot {
                Slot::Value(idx) => {
                    let column = &table.columns[*idx];
                    let value = row.get(*idx).ok_or_else(|| {
                        SqlBridgeError::ParameterError(format!(
                            "row in table {} has no value for {}",
                            table.name, column.name
                        ))
                    })?;
                    column_data(table, &column.name, column.kind, value)?
                }
                Slot::Null(null) => null.clone(),
            };
            token_row.push(cell);
        }
        request.send(token_row).await?;
    }
    let result = request.finalize().await?;
    Ok(result.total())
}

/// Table-locked bulk load inside one transaction; rolls back and re-raises on failure.
pub(crate) async fn bulk_load(
    conn: &mut MssqlConnection,
    table: &TableData,
) -> Result<u64, SqlBridgeError> {
    table.validate()?;
    conn.batch("BEGIN TRANSACTION").await?;
    match load(conn, table).await {
        Ok(written) => {
            conn.batch("COMMIT TRANSACTION").await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rollback) = conn.batch("ROLLBACK TRANSACTION").await {
                tracing::warn!(error = %rollback, table = %table.name, "bulk load rollback failed");
            }
            Err(e)
        }
    }
}

/// Schema-qualified name of `procedure`'s table-type parameter `@<table>`.
async fn table_type(
    conn: &mut MssqlConnection,
    procedure: &str,
    table: &TableData,
) -> Result<String, SqlBridgeError> {
    let sql = "SELECT SCHEMA_NAME(tt.schema_id) AS type_schema, tt.name AS type_name \
               FROM sys.parameters p \
               JOIN sys.table_types tt ON p.user_type_id = tt.user_type_id \
               WHERE p.object_id = OBJECT_ID(@P1) AND p.name = @P2 AND p.is_readonly = 1";
    let query = bound_query(
        sql.to_string(),
        [
            RowValues::from(procedure),
            RowValues::Text(format!("@{}", table.name)),
        ],
    );
    let stream = query.query(&mut conn.client).await?;
    let found = build_result_set(stream).await?;
    let row = found.results.first().ok_or_else(|| {
        SqlBridgeError::ParameterError(format!(
            "procedure {procedure} has no table-valued parameter @{}",
            table.name
        ))
    })?;
    let schema: String = row.try_get("type_schema")?;
    let name: String = row.try_get("type_name")?;
    Ok(format!("[{schema}].[{name}]"))
}

/// One batch declaring a table variable, filling it and passing it to `procedure`.
pub(crate) fn table_valued_batch(
    procedure: &str,
    type_name: &str,
    table: &TableData,
) -> Result<String, SqlBridgeError> {
    let params = table.rows.len() * table.columns.len();
    if params > MAX_PARAMS {
        return Err(SqlBridgeError::ParameterError(format!(
            "table {} needs {params} parameters, at most {MAX_PARAMS} are allowed",
            table.name
        )));
    }

    let mut sql = format!("DECLARE @tvp {type_name};");
    let mut marker = 0;
    for chunk in table.rows.chunks(MAX_VALUES_ROWS) {
        let tuples: Vec<String> = chunk
            .iter()
            .map(|row| {
                let markers: Vec<String> = row
                    .iter()
                    .map(|_| {
                        marker += 1;
                        format!("@P{marker}")
                    })
                    .collect();
                format!("({})", markers.join(", "))
            })
            .collect();
        sql.push_str(&format!(
            " INSERT INTO @tvp ({}) VALUES {};",
            table.column_list(),
            tuples.join(", ")
        ));
    }
    sql.push_str(&format!(
        " DECLARE @returnValue INT; EXEC @returnValue = {procedure} @{} = @tvp; SELECT @returnValue AS returnValue;",
        table.name
    ));
    Ok(sql)
}

/// Pass `table` to `procedure` as its table-valued parameter; returns the procedure's
/// return value (0 when it returns none).
pub(crate) async fn table_valued_call(
    conn: &mut MssqlConnection,
    procedure: &str,
    table: &TableData,
) -> Result<i32, SqlBridgeError> {
    table.validate()?;
    let type_name = table_type(conn, procedure, table).await?;
    let sql = table_valued_batch(procedure, &type_name, table)?;
    let values = table.rows.iter().flatten().cloned();
    let stream = bound_query(sql, values).query(&mut conn.client).await?;
    let value = last_result_value(stream).await?;
    Ok(value
        .as_int()
        .and_then(|v| i32::try_from(*v).ok())
        .unwrap_or_default())
}
