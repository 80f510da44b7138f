//! MySQL schema introspection.
//!
//! Queries and row readers backing `list_databases`, `list_tables` and
//! `describe_table`. All lookups run against the connection's current database,
//! which is why a database override is served by a connection opened on that
//! database rather than by a schema argument.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, TableEntry};
use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlConnection, Row};
use tracing::debug;

pub(crate) mod queries {
    pub const LIST_DATABASES: &str = "SHOW DATABASES";

    pub const LIST_TABLES: &str = "SHOW FULL TABLES";

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(EXTRA USING utf8mb4) AS EXTRA
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;

    pub const SERVER_VERSION: &str = "SELECT VERSION()";

    pub const READ_ONLY_SESSION: &str = "SET SESSION TRANSACTION READ ONLY";
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

/// Safely get a string from a MySQL row by index.
pub(crate) fn get_string_by_index(row: &MySqlRow, index: usize) -> Option<String> {
    row.try_get::<String, _>(index).ok().or_else(|| {
        row.try_get::<Vec<u8>, _>(index)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    })
}

/// Build a column descriptor from one `information_schema.columns` row.
fn column_from_row(row: &MySqlRow) -> ColumnDescriptor {
    let nullable = get_string(row, "IS_NULLABLE") == "YES";
    let mut col = ColumnDescriptor::new(
        get_string(row, "COLUMN_NAME"),
        get_string(row, "COLUMN_TYPE"),
        nullable,
    )
    .with_key(get_string(row, "COLUMN_KEY"))
    .with_extra(get_string(row, "EXTRA"));

    if let Some(default) = get_optional_string(row, "COLUMN_DEFAULT") {
        col = col.with_default(default);
    }
    col
}

/// Names from the first column of a `SHOW ...` result, in server order.
fn first_column(rows: &[MySqlRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| get_string_by_index(row, 0))
        .collect()
}

pub async fn list_databases(conn: &mut MySqlConnection) -> DbResult<Vec<String>> {
    let rows = conn.fetch_all(queries::LIST_DATABASES).await?;
    let databases = first_column(&rows);
    debug!(count = databases.len(), "Listed MySQL databases");
    Ok(databases)
}

/// `SHOW FULL TABLES` rows: name first, `Table_type` second.
pub async fn list_tables(conn: &mut MySqlConnection) -> DbResult<Vec<TableEntry>> {
    let rows = conn.fetch_all(queries::LIST_TABLES).await?;
    let tables: Vec<TableEntry> = rows
        .iter()
        .filter_map(|row| {
            let name = get_string_by_index(row, 0)?;
            let table_type = get_string_by_index(row, 1).unwrap_or_default();
            Some(TableEntry::new(name, table_type))
        })
        .collect();
    debug!(count = tables.len(), "Listed MySQL tables");
    Ok(tables)
}

/// Columns of `table` in declared order. A table with no visible columns does
/// not exist as far as the caller is concerned.
pub async fn describe_table(
    conn: &mut MySqlConnection,
    table: &str,
) -> DbResult<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    if rows.is_empty() {
        return Err(DbError::schema(
            format!("Table '{}' not found", table),
            table.to_string(),
        ));
    }

    let columns: Vec<ColumnDescriptor> = rows.iter().map(column_from_row).collect();
    debug!(table = %table, count = columns.len(), "Described MySQL table");
    Ok(columns)
}
