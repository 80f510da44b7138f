//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `connect`: `connect_db`, (re)connect the session
//! - `schema`: `list_databases`, `list_tables`, `describe_table`
//! - `query`: `execute_query`, read-only SQL
//! - `sql_validator`: read-only gate applied before any query reaches the server
//!
//! Tools form a closed set. `ToolKind` names them, `ToolCall` pairs a kind with
//! its decoded input, and `ToolCall::invoke` is the only place a call reaches a
//! handler.

pub mod connect;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use connect::{ConnectDbInput, ConnectDbOutput, ConnectToolHandler};
pub use query::{ExecuteQueryInput, ExecuteQueryOutput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListDatabasesInput, ListDatabasesOutput,
    ListTablesInput, ListTablesOutput, SchemaToolHandler,
};

use crate::db::{ConnectionManager, Driver};
use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// The five tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ConnectDb,
    ListDatabases,
    ListTables,
    DescribeTable,
    ExecuteQuery,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::ConnectDb,
        ToolKind::ListDatabases,
        ToolKind::ListTables,
        ToolKind::DescribeTable,
        ToolKind::ExecuteQuery,
    ];

    /// Wire name of the tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ConnectDb => "connect_db",
            ToolKind::ListDatabases => "list_databases",
            ToolKind::ListTables => "list_tables",
            ToolKind::DescribeTable => "describe_table",
            ToolKind::ExecuteQuery => "execute_query",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ConnectDb => {
                "Connect to a MySQL server. Replaces the current connection. \
                 The optional database becomes the default for later calls."
            }
            ToolKind::ListDatabases => "List all databases visible to the connected user.",
            ToolKind::ListTables => {
                "List tables in the default database, or in 'database' for this call only."
            }
            ToolKind::DescribeTable => {
                "Describe the columns of a table: name, type, nullability, key, default and extra."
            }
            ToolKind::ExecuteQuery => {
                "Execute a single read-only query. Only SELECT, SHOW, DESCRIBE, DESC and \
                 EXPLAIN statements are allowed."
            }
        }
    }

    /// JSON Schema of the tool's input.
    pub fn input_schema(self) -> JsonValue {
        let schema = match self {
            ToolKind::ConnectDb => schemars::schema_for!(ConnectDbInput),
            ToolKind::ListDatabases => schemars::schema_for!(ListDatabasesInput),
            ToolKind::ListTables => schemars::schema_for!(ListTablesInput),
            ToolKind::DescribeTable => schemars::schema_for!(DescribeTableInput),
            ToolKind::ExecuteQuery => schemars::schema_for!(ExecuteQueryInput),
        };
        serde_json::to_value(schema).unwrap_or(JsonValue::Null)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog entry returned by `MCP/listTools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

/// Every tool with its input schema, in a stable order.
pub fn tool_catalog() -> Vec<ToolDescriptor> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| ToolDescriptor {
            name: kind.name(),
            description: kind.description(),
            input_schema: kind.input_schema(),
        })
        .collect()
}

/// Typed tool input, checked before any handler runs.
pub trait ToolInput: DeserializeOwned + JsonSchema {
    /// Reject inputs that deserialize but are still unusable (e.g. empty names).
    fn validate(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Fail with a validation error if a required text parameter is blank.
pub(crate) fn require_non_empty(name: &str, value: &str) -> DbResult<()> {
    if value.trim().is_empty() {
        return Err(DbError::invalid_input(format!(
            "Parameter '{}' must not be empty",
            name
        )));
    }
    Ok(())
}

/// Optional database override, where an empty string means "not given".
pub(crate) fn database_override(database: &Option<String>) -> Option<&str> {
    database.as_deref().map(str::trim).filter(|db| !db.is_empty())
}

fn decode_input<T: ToolInput>(kind: ToolKind, params: JsonValue) -> DbResult<T> {
    let params = match params {
        JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
        other => other,
    };
    let input: T = serde_json::from_value(params)
        .map_err(|e| DbError::invalid_input(format!("Invalid parameters for {}: {}", kind, e)))?;
    input.validate()?;
    Ok(input)
}

/// A tool invocation with decoded, validated input.
#[derive(Debug, Clone)]
pub enum ToolCall {
    ConnectDb(ConnectDbInput),
    ListDatabases(ListDatabasesInput),
    ListTables(ListTablesInput),
    DescribeTable(DescribeTableInput),
    ExecuteQuery(ExecuteQueryInput),
}

impl ToolCall {
    /// Decode `params` into the input type of `kind`.
    ///
    /// Absent params are treated as an empty object. Missing or blank required
    /// parameters fail here, before any handler is invoked.
    pub fn decode(kind: ToolKind, params: JsonValue) -> DbResult<Self> {
        Ok(match kind {
            ToolKind::ConnectDb => ToolCall::ConnectDb(decode_input(kind, params)?),
            ToolKind::ListDatabases => ToolCall::ListDatabases(decode_input(kind, params)?),
            ToolKind::ListTables => ToolCall::ListTables(decode_input(kind, params)?),
            ToolKind::DescribeTable => ToolCall::DescribeTable(decode_input(kind, params)?),
            ToolKind::ExecuteQuery => ToolCall::ExecuteQuery(decode_input(kind, params)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::ConnectDb(_) => ToolKind::ConnectDb,
            ToolCall::ListDatabases(_) => ToolKind::ListDatabases,
            ToolCall::ListTables(_) => ToolKind::ListTables,
            ToolCall::DescribeTable(_) => ToolKind::DescribeTable,
            ToolCall::ExecuteQuery(_) => ToolKind::ExecuteQuery,
        }
    }

    /// Run the call against the session and serialize its output.
    pub async fn invoke<D: Driver>(self, manager: &mut ConnectionManager<D>) -> DbResult<JsonValue> {
        match self {
            ToolCall::ConnectDb(input) => {
                to_json(ConnectToolHandler::new(manager).connect_db(input).await?)
            }
            ToolCall::ListDatabases(input) => {
                to_json(SchemaToolHandler::new(manager).list_databases(input).await?)
            }
            ToolCall::ListTables(input) => {
                to_json(SchemaToolHandler::new(manager).list_tables(input).await?)
            }
            ToolCall::DescribeTable(input) => {
                to_json(SchemaToolHandler::new(manager).describe_table(input).await?)
            }
            ToolCall::ExecuteQuery(input) => {
                to_json(QueryToolHandler::new(manager).execute_query(input).await?)
            }
        }
    }
}

fn to_json<T: Serialize>(output: T) -> DbResult<JsonValue> {
    serde_json::to_value(output)
        .map_err(|e| DbError::internal(format!("Failed to serialize tool output: {}", e)))
}
