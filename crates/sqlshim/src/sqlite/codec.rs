//! Moving values between `SqlValue` and sqlx's SQLite types.

use sqlshim_core::{Row, SqlValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteQueryResult, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::Result;

/// Binds a SqlValue parameter to a raw query.
fn bind_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

fn prepare(sql: &str, params: Vec<SqlValue>) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    params.into_iter().fold(sqlx::query(sql), bind_param)
}

/// Runs a statement that returns no rows.
pub(crate) async fn execute(
    conn: &mut SqliteConnection,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<SqliteQueryResult> {
    debug!(sql = %sql, params = params.len(), "Executing SQL");
    let result = prepare(sql, params).execute(conn).await?;
    Ok(result)
}

/// Runs a query and decodes every row.
pub(crate) async fn fetch_all(
    conn: &mut SqliteConnection,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<Row>> {
    debug!(sql = %sql, params = params.len(), "Fetching rows");
    let rows = prepare(sql, params).fetch_all(conn).await?;
    rows.iter().map(decode_row).collect()
}

/// Decodes a row using the storage class of each value, not the declared
/// column type: SQLite lets any column hold any class.
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked(index)?),
                "REAL" => SqlValue::Float(row.try_get_unchecked(index)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
                _ => SqlValue::Text(row.try_get_unchecked(index)?),
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}
