use rusqlite::{types::ValueRef, OpenFlags};
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::models::{Schema, TabularResult};

/// Live SQLite database the assistant reads from.
pub struct DataSource {
    conn: Connection,
}

#[derive(Debug)]
enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob,
}

impl From<SqlValue> for JsonValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Integer(i) => JsonValue::Number(i.into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Text(s) => JsonValue::String(s),
            SqlValue::Blob => JsonValue::String("BLOB".to_string()),
        }
    }
}

impl DataSource {
    /// Opens the database file read-only.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        info!("Opening SQLite database at {}", path.display());
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).await.map_err(|e| {
            error!("Failed to open database {}: {}", path.display(), e);
            AppError::Database(e.to_string())
        })?;
        Ok(Self { conn })
    }

    /// Wraps an already-open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Lists user tables (sorted by name) with their columns in declaration order.
    pub async fn reflect_schema(&self) -> Result<Schema, AppError> {
        debug!("Reflecting database schema");
        let schema = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                     ORDER BY name",
                )?;
                let tables: Vec<String> = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<_, _>>()?;

                let mut schema = Schema::new();
                for table in tables {
                    let quoted = table.replace('"', "\"\"");
                    let pragma_sql = format!("PRAGMA table_info(\"{}\")", quoted);
                    let mut stmt = conn.prepare(&pragma_sql)?;
                    let columns: Vec<String> = stmt
                        .query_map([], |row| row.get::<_, String>(1))?
                        .collect::<Result<_, _>>()?;
                    schema.insert(table, columns);
                }
                Ok(schema)
            })
            .await?;

        info!("Reflected {} tables", schema.len());
        Ok(schema)
    }

    /// Runs a query that already passed the read-only gate and the row cap.
    pub async fn execute_readonly(&self, sql: &str) -> Result<TabularResult, AppError> {
        info!("Executing SQL query: {}", sql);
        let sql = sql.to_string();

        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;

                let columns: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let column_count = stmt.column_count();

                let mut rows_data = Vec::new();
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let mut row_values = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        let value = match row.get_ref(i)? {
                            ValueRef::Null => SqlValue::Null,
                            ValueRef::Integer(i) => SqlValue::Integer(i),
                            ValueRef::Real(f) => SqlValue::Float(f),
                            ValueRef::Text(t) => {
                                SqlValue::Text(String::from_utf8_lossy(t).into_owned())
                            }
                            ValueRef::Blob(_) => SqlValue::Blob,
                        };
                        row_values.push(JsonValue::from(value));
                    }
                    rows_data.push(row_values);
                }

                Ok(TabularResult { columns, rows: rows_data })
            })
            .await
            .map_err(|e| {
                error!("Query execution failed: {}", e);
                AppError::ExecutionFailure(e.to_string())
            })?;

        debug!("Query returned {} rows", result.rows.len());
        Ok(result)
    }
}
