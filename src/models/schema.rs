//! Schema-related data models.
//!
//! This module defines types for database schema introspection.

use schemars::JsonSchema;
use serde::Serialize;

/// Column metadata as reported by `describe_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Full type (e.g., `varchar(30)`, `bigint unsigned`)
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    /// `PRI`, `UNI` or `MUL`; absent when the column is not indexed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// MySQL extra attributes (e.g., `auto_increment`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable,
            key: None,
            default: None,
            extra: None,
        }
    }

    /// Set the index key kind. Empty strings mean "no key".
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    /// Set the default value as rendered by the server.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the extra attributes. Empty strings are dropped.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into()).filter(|e: &String| !e.is_empty());
        self
    }
}

/// One entry of `SHOW FULL TABLES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TableEntry {
    pub name: String,
    /// `BASE TABLE`, `VIEW` or `SYSTEM VIEW`
    #[serde(rename = "type")]
    pub table_type: String,
}

impl TableEntry {
    pub fn new(name: impl Into<String>, table_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_type: table_type.into(),
        }
    }
}
