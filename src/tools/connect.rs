//! Connection tool.
//!
//! This module implements the `connect_db` MCP tool.

use crate::config::DEFAULT_MYSQL_PORT;
use crate::db::{ConnectionManager, Driver};
use crate::error::DbResult;
use crate::models::{ConnectionConfig, ConnectionInfo};
use crate::tools::{ToolInput, database_override, require_non_empty};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

/// Input for the connect_db tool.
#[derive(Clone, Deserialize, JsonSchema)]
pub struct ConnectDbInput {
    /// MySQL server host name or IP address
    pub host: String,
    /// MySQL server port. Default: 3306
    #[serde(default = "default_port")]
    pub port: u16,
    /// User name
    pub user: String,
    /// Password. Default: empty
    #[serde(default)]
    pub password: String,
    /// Database to select and use as the default for later calls
    #[serde(default)]
    pub database: Option<String>,
}

impl std::fmt::Debug for ConnectDbInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectDbInput")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl ToolInput for ConnectDbInput {
    fn validate(&self) -> DbResult<()> {
        require_non_empty("host", &self.host)?;
        require_non_empty("user", &self.user)
    }
}

impl From<ConnectDbInput> for ConnectionConfig {
    fn from(input: ConnectDbInput) -> Self {
        let database = database_override(&input.database).map(str::to_string);
        ConnectionConfig::new(
            input.host.trim(),
            input.port,
            input.user,
            input.password,
            database,
        )
    }
}

/// Output from the connect_db tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectDbOutput {
    pub success: bool,
    pub connection: ConnectionInfo,
}

/// Handler for the connect_db tool.
pub struct ConnectToolHandler<'a, D: Driver> {
    connection_manager: &'a mut ConnectionManager<D>,
}

impl<'a, D: Driver> ConnectToolHandler<'a, D> {
    pub fn new(connection_manager: &'a mut ConnectionManager<D>) -> Self {
        Self { connection_manager }
    }

    /// Replace the session connection.
    ///
    /// On failure the previous connection is already gone and the session is
    /// left disconnected.
    pub async fn connect_db(self, input: ConnectDbInput) -> DbResult<ConnectDbOutput> {
        let config = ConnectionConfig::from(input);
        let connection = self.connection_manager.connect(config).await?;

        info!(
            host = %connection.host,
            port = connection.port,
            database = connection.database.as_deref().unwrap_or("<none>"),
            "connect_db succeeded"
        );

        Ok(ConnectDbOutput {
            success: true,
            connection,
        })
    }
}
