//! Configuration handling for the MySQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment
//! variables. The `MYSQL_*` variables supply the default connection used when a
//! client calls a tool without calling `connect_db` first.

use crate::models::ConnectionConfig;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Bounded timeouts applied to every database round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Applies to the handshake and to liveness pings.
    pub connect: Duration,
    /// Applies to every statement, including schema introspection.
    pub query: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the MySQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MCP server exposing read-only MySQL operations over stdio",
    version,
    author
)]
pub struct Config {
    /// Default MySQL host used for lazy connections
    #[arg(long, default_value = DEFAULT_MYSQL_HOST, env = "MYSQL_HOST")]
    pub host: String,

    /// Default MySQL port
    #[arg(long, default_value_t = DEFAULT_MYSQL_PORT, env = "MYSQL_PORT")]
    pub port: u16,

    /// Default MySQL user. Without it, clients must call connect_db first.
    #[arg(long, env = "MYSQL_USER")]
    pub user: Option<String>,

    /// Default MySQL password
    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Default database selected after connecting
    #[arg(long, env = "MYSQL_DATABASE")]
    pub database: Option<String>,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MYSQL_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MYSQL_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: DEFAULT_MYSQL_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: None,
            password: None,
            database: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Reject settings that would make the dispatch loop unbounded.
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout == 0 {
            return Err("--connect-timeout must be greater than zero".to_string());
        }
        if self.query_timeout == 0 {
            return Err("--query-timeout must be greater than zero".to_string());
        }
        if self.host.trim().is_empty() {
            return Err("--host must not be empty".to_string());
        }
        Ok(())
    }

    /// Build the default connection from environment-sourced settings.
    ///
    /// Returns `None` when no user is configured; lazy connect is then unavailable
    /// and clients must call `connect_db`.
    pub fn default_connection(&self) -> Option<ConnectionConfig> {
        let user = self.user.as_deref().filter(|u| !u.is_empty())?;
        let database = self
            .database
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(String::from);

        Some(ConnectionConfig::new(
            self.host.clone(),
            self.port,
            user,
            self.password.clone().unwrap_or_default(),
            database,
        ))
    }

    /// Get both timeouts.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: self.connect_timeout_duration(),
            query: self.query_timeout_duration(),
        }
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
