//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. Statements are checked
//! by the read-only gate before a connection is even acquired.

use crate::db::{ConnectionManager, DbConnection, Driver};
use crate::error::DbResult;
use crate::tools::{ToolInput, database_override, require_non_empty, sql_validator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// A single read-only statement (SELECT, SHOW, DESCRIBE, DESC or EXPLAIN)
    pub query: String,
    /// Database to run against for this call only. Default: the session's database
    #[serde(default)]
    pub database: Option<String>,
}

impl ToolInput for ExecuteQueryInput {
    fn validate(&self) -> DbResult<()> {
        require_non_empty("query", &self.query)
    }
}

/// Output from the execute_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteQueryOutput {
    /// Database the query ran against
    pub database: Option<String>,
    /// Column names in select-list order, present even when no rows matched
    pub columns: Vec<String>,
    /// Result rows keyed by column name
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Handler for query execution.
pub struct QueryToolHandler<'a, D: Driver> {
    connection_manager: &'a mut ConnectionManager<D>,
}

impl<'a, D: Driver> QueryToolHandler<'a, D> {
    pub fn new(connection_manager: &'a mut ConnectionManager<D>) -> Self {
        Self { connection_manager }
    }

    /// Handle the execute_query tool call.
    ///
    /// Rejected statements never reach the connection manager, so a rejection
    /// does not trigger a lazy connect.
    pub async fn execute_query(self, input: ExecuteQueryInput) -> DbResult<ExecuteQueryOutput> {
        sql_validator::validate_readonly(&input.query)?;

        let database = database_override(&input.database);
        let mut lease = self.connection_manager.acquire(database).await?;
        let target = lease.database().map(str::to_string);
        let result = lease.fetch_all(&input.query).await;
        self.connection_manager.release(lease, &result).await;

        let result = result?;
        info!(
            database = target.as_deref().unwrap_or("<none>"),
            row_count = result.row_count,
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(ExecuteQueryOutput {
            database: target,
            columns: result.columns,
            rows: result.rows,
            row_count: result.row_count,
            execution_time_ms: result.execution_time_ms,
        })
    }
}
