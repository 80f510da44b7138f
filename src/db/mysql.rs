//! sqlx-backed MySQL driver.

use crate::config::Timeouts;
use crate::db::driver::{DbConnection, Driver};
use crate::db::schema::{self, queries};
use crate::db::types::{RowToJson, unique_column_names};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, ConnectionConfig, QueryResult, TableEntry};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Column, ConnectOptions, Connection, Executor, MySqlConnection};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opens single MySQL connections with sqlx.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);
        if let Some(db) = &config.database {
            options = options.database(db);
        }
        options
    }

    /// Handshake, read-only session and version lookup, all under one deadline.
    async fn open(config: &ConnectionConfig) -> DbResult<(MySqlConnection, Option<String>)> {
        let mut conn = Self::connect_options(config)
            .connect()
            .await
            .map_err(|e| connect_error(config, e))?;

        conn.execute(queries::READ_ONLY_SESSION)
            .await
            .map_err(|e| connect_error(config, e))?;

        let server_version = match sqlx::query_scalar::<_, String>(queries::SERVER_VERSION)
            .fetch_one(&mut conn)
            .await
        {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(error = %e, "Could not read server version");
                None
            }
        };
        Ok((conn, server_version))
    }
}

/// Anything that goes wrong while opening a connection is a connection error,
/// including authentication failures the server reports as database errors.
fn connect_error(config: &ConnectionConfig, err: sqlx::Error) -> DbError {
    let message = match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("{} (SQLSTATE: {})", db_err.message(), code),
            None => db_err.message().to_string(),
        },
        other => other.to_string(),
    };
    DbError::connection(
        format!("Cannot connect to {}: {}", config.endpoint(), message),
        "Check host, port, credentials and that the MySQL server is reachable",
    )
}

impl Driver for MySqlDriver {
    type Connection = MySqlHandle;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        timeouts: &Timeouts,
    ) -> DbResult<Self::Connection> {
        let (conn, server_version) = tokio::time::timeout(timeouts.connect, Self::open(config))
            .await
            .map_err(|_| {
                DbError::connection(
                    format!(
                        "Connecting to {} timed out after {}s",
                        config.endpoint(),
                        timeouts.connect.as_secs()
                    ),
                    "Check that the MySQL server is reachable or raise --connect-timeout",
                )
            })??;

        Ok(MySqlHandle {
            conn,
            server_version,
            query_timeout: timeouts.query,
        })
    }
}

/// One live MySQL connection with its query timeout.
#[derive(Debug)]
pub struct MySqlHandle {
    conn: MySqlConnection,
    server_version: Option<String>,
    query_timeout: Duration,
}

impl DbConnection for MySqlHandle {
    async fn ping(&mut self) -> DbResult<()> {
        self.conn.ping().await.map_err(|e| {
            DbError::connection(
                format!("Ping failed: {}", e),
                "The connection will be re-established on the next call",
            )
        })
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            debug!(error = %e, "Error while closing MySQL connection");
        }
    }

    fn server_version(&self) -> Option<String> {
        self.server_version.clone()
    }

    async fn list_databases(&mut self) -> DbResult<Vec<String>> {
        let timeout = self.query_timeout;
        with_timeout(timeout, "list databases", schema::list_databases(&mut self.conn)).await
    }

    async fn list_tables(&mut self) -> DbResult<Vec<TableEntry>> {
        let timeout = self.query_timeout;
        with_timeout(timeout, "list tables", schema::list_tables(&mut self.conn)).await
    }

    async fn describe_table(&mut self, table: &str) -> DbResult<Vec<ColumnDescriptor>> {
        let timeout = self.query_timeout;
        with_timeout(
            timeout,
            "describe table",
            schema::describe_table(&mut self.conn, table),
        )
        .await
    }

    async fn fetch_all(&mut self, sql: &str) -> DbResult<QueryResult> {
        debug!(sql = %sql, "Executing query");
        let timeout = self.query_timeout;
        let start = Instant::now();

        // Raw SQL goes over the text protocol, which accepts SHOW/DESCRIBE/EXPLAIN
        let rows = with_timeout(timeout, "query execution", async {
            self.conn.fetch_all(sql).await.map_err(DbError::from)
        })
        .await?;
        let elapsed = start.elapsed().as_millis() as u64;

        let columns = match rows.first() {
            Some(row) => row.column_names(),
            None => self.result_columns(sql).await?,
        };
        let rows = rows.iter().map(|r| r.to_json_map()).collect();
        Ok(QueryResult::new(columns, rows, elapsed))
    }
}

impl MySqlHandle {
    /// Column names of a statement's result set, read from its prepared metadata.
    ///
    /// Used when a query matched no rows. Statements the server refuses to prepare
    /// report no columns; timeouts and connection failures are returned.
    async fn result_columns(&mut self, sql: &str) -> DbResult<Vec<String>> {
        let timeout = self.query_timeout;
        let described = with_timeout(timeout, "describe result columns", async {
            self.conn.describe(sql).await.map_err(DbError::from)
        })
        .await;

        match described {
            Ok(describe) => {
                let names: Vec<String> = describe
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                Ok(unique_column_names(&names))
            }
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                debug!(error = %e, "Could not describe result columns");
                Ok(Vec::new())
            }
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DbError::timeout(operation, limit.as_secs()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_hides_password() {
        let config = ConnectionConfig::new("db.internal", 3306, "reader", "hunter2", None);
        let err = connect_error(&config, sqlx::Error::Protocol("handshake failed".into()));
        let text = err.to_string();
        assert!(err.is_retryable());
        assert!(text.contains("reader@db.internal:3306"));
        assert!(!text.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_connect_deadline_covers_silent_server() {
        // Accepts TCP connections but never sends a handshake
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::new("127.0.0.1", port, "reader", "secret", None);
        let timeouts = Timeouts {
            connect: Duration::from_millis(200),
            query: Duration::from_millis(200),
        };

        let err = MySqlDriver::new()
            .connect(&config, &timeouts)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.to_string().contains("timed out"));
        drop(listener);
    }
}
