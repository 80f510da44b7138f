//! Query-related data models.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Rows returned by a read-only statement, already converted to protocol-safe JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in select-list order, present even when no rows matched.
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a result from converted rows.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<serde_json::Map<String, JsonValue>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }
}
