//! MySQL MCP Server - Main entry point.
//!
//! This server provides read-only MCP (Model Context Protocol) tools for AI
//! assistants to explore and query a MySQL database.

use mysql_mcp_server::config::Config;
use mysql_mcp_server::db::{ConnectionManager, MySqlDriver};
use mysql_mcp_server::mcp::DbService;
use mysql_mcp_server::transport::{StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout carries protocol messages only.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    if let Err(reason) = config.validate() {
        error!(reason = %reason, "Invalid configuration");
        return Err(reason.into());
    }

    let defaults = config.default_connection();
    let default_endpoint = defaults
        .as_ref()
        .map(|c| c.endpoint())
        .unwrap_or_else(|| "<none>".to_string());
    info!(
        default_connection = %default_endpoint,
        connect_timeout_secs = config.connect_timeout,
        query_timeout_secs = config.query_timeout,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The session starts empty; the first tool call connects lazily
    let connection_manager = ConnectionManager::new(MySqlDriver::new(), config.timeouts(), defaults);
    let transport = StdioTransport::new(DbService::new(connection_manager));

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
