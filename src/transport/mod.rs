//! Transport layer for the MCP server.
//!
//! This module provides the transport the dispatcher runs on:
//! - Stdio: line-delimited JSON-RPC over standard input/output

pub mod stdio;

pub use stdio::StdioTransport;

use crate::error::DbResult;
use std::future::Future;

/// Trait for MCP transport implementations.
///
/// Transports handle the low-level communication between the MCP server
/// and clients, abstracting away the protocol details.
pub trait Transport {
    /// Start the transport and begin handling requests.
    ///
    /// Resolves once the client is gone or the process was asked to stop. The
    /// database connection is closed before it returns.
    fn run(self) -> impl Future<Output = DbResult<()>>;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
