//! Shared test fixtures: an in-memory driver standing in for MySQL.
//!
//! The mock server knows three databases, `shop` (tables `customers`, `orders`),
//! `analytics` (table `events`) and `reports` (view `daily_sales`), and accepts
//! the password `secret`.

#![allow(dead_code)]

use mysql_mcp_server::config::Timeouts;
use mysql_mcp_server::db::{ConnectionManager, DbConnection, Driver};
use mysql_mcp_server::error::{DbError, DbResult};
use mysql_mcp_server::mcp::DbService;
use mysql_mcp_server::models::{ColumnDescriptor, ConnectionConfig, QueryResult, TableEntry};
use serde_json::{Value as JsonValue, json};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const PASSWORD: &str = "secret";
pub const SERVER_VERSION: &str = "8.0.36-mock";

/// Observable state shared by the driver and every connection it opened.
#[derive(Debug, Default)]
pub struct MockState {
    /// Successful connects.
    pub connects: usize,
    pub connect_attempts: usize,
    pub closes: usize,
    pub pings: usize,
    /// Fail the next ping, simulating a connection the server dropped.
    pub fail_next_ping: bool,
    /// Refuse every connect attempt, simulating an unreachable server.
    pub refuse_connections: bool,
    /// `(database, sql)` for every statement that reached the server.
    pub queries: Vec<(Option<String>, String)>,
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn handle(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }
}

fn tables_of(database: &str) -> Option<Vec<TableEntry>> {
    match database {
        "shop" => Some(vec![
            TableEntry::new("customers", "BASE TABLE"),
            TableEntry::new("orders", "BASE TABLE"),
        ]),
        "analytics" => Some(vec![TableEntry::new("events", "BASE TABLE")]),
        "reports" => Some(vec![TableEntry::new("daily_sales", "VIEW")]),
        _ => None,
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        _timeouts: &Timeouts,
    ) -> DbResult<MockConnection> {
        let mut state = self.state.lock().unwrap();
        state.connect_attempts += 1;

        if state.refuse_connections || config.host == "unreachable" {
            return Err(DbError::connection(
                format!("Can't connect to MySQL server on '{}'", config.host),
                "Check that the server is running",
            ));
        }
        if config.password != PASSWORD {
            return Err(DbError::connection(
                format!("Access denied for user '{}'", config.user),
                "Check the credentials",
            ));
        }
        if let Some(db) = &config.database {
            if tables_of(db).is_none() {
                return Err(DbError::connection(
                    format!("Unknown database '{}'", db),
                    "Check the database name",
                ));
            }
        }

        state.connects += 1;
        Ok(MockConnection {
            database: config.database.clone(),
            state: self.state.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    database: Option<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn record(&self, sql: &str) {
        self.state
            .lock()
            .unwrap()
            .queries
            .push((self.database.clone(), sql.to_string()));
    }
}

impl DbConnection for MockConnection {
    async fn ping(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.pings += 1;
        if std::mem::take(&mut state.fail_next_ping) {
            return Err(DbError::connection("Server has gone away", "Reconnect"));
        }
        Ok(())
    }

    async fn close(self) {
        self.state.lock().unwrap().closes += 1;
    }

    fn server_version(&self) -> Option<String> {
        Some(SERVER_VERSION.to_string())
    }

    async fn list_databases(&mut self) -> DbResult<Vec<String>> {
        self.record("SHOW DATABASES");
        Ok(vec![
            "information_schema".to_string(),
            "shop".to_string(),
            "analytics".to_string(),
        ])
    }

    async fn list_tables(&mut self) -> DbResult<Vec<TableEntry>> {
        self.record("SHOW FULL TABLES");
        let Some(db) = self.database.as_deref() else {
            return Err(DbError::database(
                "No database selected",
                Some("3D000".to_string()),
                "Select a database",
            ));
        };
        Ok(tables_of(db).unwrap_or_default())
    }

    async fn describe_table(&mut self, table: &str) -> DbResult<Vec<ColumnDescriptor>> {
        self.record(&format!("DESCRIBE {}", table));
        match (self.database.as_deref(), table) {
            (Some("shop"), "customers") => Ok(vec![
                ColumnDescriptor::new("id", "int", false)
                    .with_key("PRI")
                    .with_extra("auto_increment"),
                ColumnDescriptor::new("name", "varchar(64)", true),
            ]),
            _ => Err(DbError::schema(
                format!("Table '{}' not found", table),
                table.to_string(),
            )),
        }
    }

    async fn fetch_all(&mut self, sql: &str) -> DbResult<QueryResult> {
        self.record(sql);

        if sql.contains("PANIC") {
            panic!("driver bug");
        }
        if sql.contains("SLEEP") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if sql.contains("LOSE_CONNECTION") {
            return Err(DbError::connection("Lost connection to MySQL server", "Retry"));
        }
        if sql.contains("missing_table") {
            return Err(DbError::database(
                "Table 'shop.missing_table' doesn't exist",
                Some("42S02".to_string()),
                "Check the SQL syntax and referenced objects",
            ));
        }

        let mut row = serde_json::Map::new();
        row.insert(
            "db".to_string(),
            self.database.clone().map(JsonValue::String).unwrap_or(JsonValue::Null),
        );
        row.insert("sql".to_string(), json!(sql));
        Ok(QueryResult::new(
            vec!["db".to_string(), "sql".to_string()],
            vec![row],
            1,
        ))
    }
}

/// Connection settings the mock accepts.
pub fn valid_config(database: Option<&str>) -> ConnectionConfig {
    ConnectionConfig::new(
        "localhost",
        3306,
        "reader",
        PASSWORD,
        database.map(str::to_string),
    )
}

pub fn manager(
    driver: &MockDriver,
    defaults: Option<ConnectionConfig>,
) -> ConnectionManager<MockDriver> {
    ConnectionManager::new(driver.clone(), Timeouts::default(), defaults)
}

pub fn service(driver: &MockDriver, defaults: Option<ConnectionConfig>) -> DbService<MockDriver> {
    DbService::new(manager(driver, defaults))
}

/// Feed `input` through the dispatch loop and parse every response line.
pub async fn run_lines(service: &mut DbService<MockDriver>, input: &str) -> Vec<JsonValue> {
    let mut output = Vec::new();
    service
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("dispatch loop failed");
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Build one request line.
pub fn request(id: u64, method: &str, params: JsonValue) -> String {
    format!(
        "{}\n",
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    )
}
