//! Connection-related data models.
//!
//! This module defines types for database connection configuration and state.

use schemars::JsonSchema;
use serde::Serialize;

/// Configuration for a MySQL connection.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    /// Database selected after connecting. None leaves no database selected.
    pub database: Option<String>,
}

impl ConnectionConfig {
    /// Create a new connection configuration.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database,
        }
    }

    /// Same server and credentials, different default database.
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..self.clone()
        }
    }

    /// Display-safe `user@host:port/database` string.
    pub fn endpoint(&self) -> String {
        match &self.database {
            Some(db) => format!("{}@{}:{}/{}", self.user, self.host, self.port, db),
            None => format!("{}@{}:{}", self.user, self.host, self.port),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Information about an active connection, returned after successful connection.
/// The password is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

impl ConnectionInfo {
    pub fn new(config: &ConnectionConfig, server_version: Option<String>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            database: config.database.clone(),
            server_version,
        }
    }
}
