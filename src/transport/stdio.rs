//! Stdio transport for the MCP server.
//!
//! This transport reads line-delimited JSON-RPC messages from stdin and writes
//! one response line per request to stdout. Logs never go to stdout.

use crate::db::Driver;
use crate::error::DbResult;
use crate::mcp::{DbService, StopReason};
use crate::transport::Transport;
use tokio::io::{BufReader, stdin, stdout};
use tokio::signal;
use tracing::{error, info, warn};

/// Stdio transport implementation.
pub struct StdioTransport<D: Driver> {
    service: DbService<D>,
}

impl<D: Driver> StdioTransport<D> {
    pub fn new(service: DbService<D>) -> Self {
        Self { service }
    }
}

impl<D: Driver> Transport for StdioTransport<D> {
    async fn run(mut self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let result = tokio::select! {
            result = self.service.serve(BufReader::new(stdin()), stdout()) => Some(result),
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                None
            }
        };

        // Anything but EOF may leave the blocking stdin reader parked, which
        // would keep the runtime from shutting down
        let force_exit = !matches!(result, Some(Ok(StopReason::InputClosed)));
        if force_exit {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connection");
        self.service.shutdown().await;

        match result {
            Some(Err(e)) => {
                error!(error = %e, "Stdio transport error");
                Err(e)
            }
            _ if force_exit => {
                info!("Exiting process");
                std::process::exit(0);
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
