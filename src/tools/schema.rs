//! Schema introspection tools.
//!
//! This module implements the `list_databases`, `list_tables` and
//! `describe_table` MCP tools.

use crate::db::{ConnectionManager, DbConnection, Driver};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, TableEntry};
use crate::tools::{ToolInput, database_override, require_non_empty};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Input for the list_databases tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListDatabasesInput {}

impl ToolInput for ListDatabasesInput {}

/// Output for the list_databases tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    pub databases: Vec<String>,
    pub count: usize,
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Database to list for this call only. Default: the session's database
    #[serde(default)]
    pub database: Option<String>,
}

impl ToolInput for ListTablesInput {}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Database the tables belong to
    pub database: Option<String>,
    /// Table and view names, in server order
    pub tables: Vec<String>,
    /// The same entries with their kind, so views can be told apart
    pub entries: Vec<TableEntry>,
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table name
    pub table: String,
    /// Database containing the table, for this call only. Default: the session's database
    #[serde(default)]
    pub database: Option<String>,
}

impl ToolInput for DescribeTableInput {
    fn validate(&self) -> DbResult<()> {
        require_non_empty("table", &self.table)
    }
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub table: String,
    pub database: Option<String>,
    /// Columns in declared order
    pub columns: Vec<ColumnDescriptor>,
}

/// Handler for schema introspection tools.
pub struct SchemaToolHandler<'a, D: Driver> {
    connection_manager: &'a mut ConnectionManager<D>,
}

impl<'a, D: Driver> SchemaToolHandler<'a, D> {
    pub fn new(connection_manager: &'a mut ConnectionManager<D>) -> Self {
        Self { connection_manager }
    }

    pub async fn list_databases(self, _input: ListDatabasesInput) -> DbResult<ListDatabasesOutput> {
        let mut lease = self.connection_manager.acquire(None).await?;
        let result = lease.list_databases().await;
        self.connection_manager.release(lease, &result).await;

        let databases = result?;
        let count = databases.len();
        info!(count = count, "Listed databases");

        Ok(ListDatabasesOutput { databases, count })
    }

    pub async fn list_tables(self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let database = database_override(&input.database);
        let mut lease = self.connection_manager.acquire(database).await?;
        let target = lease.database().map(str::to_string);
        let result = lease.list_tables().await;
        self.connection_manager.release(lease, &result).await;

        let entries = result?;
        let tables: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let count = tables.len();
        info!(
            database = target.as_deref().unwrap_or("<none>"),
            count = count,
            "Listed tables"
        );

        Ok(ListTablesOutput {
            database: target,
            tables,
            entries,
            count,
        })
    }

    pub async fn describe_table(self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let table = input.table.trim();
        let database = database_override(&input.database);
        let mut lease = self.connection_manager.acquire(database).await?;
        let target = lease.database().map(str::to_string);
        let result = lease.describe_table(table).await;
        self.connection_manager.release(lease, &result).await;

        let columns = result?;
        info!(
            table = %table,
            database = target.as_deref().unwrap_or("<none>"),
            columns = columns.len(),
            "Described table"
        );

        Ok(DescribeTableOutput {
            table: table.to_string(),
            database: target,
            columns,
        })
    }
}
