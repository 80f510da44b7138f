//! MCP protocol layer.
//!
//! This module provides the JSON-RPC envelope and the sequential dispatcher
//! that routes requests to the database tool handlers.

pub mod protocol;
pub mod service;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, Method};
pub use service::{DbService, DispatchState, Outcome, StopReason};
