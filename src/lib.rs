//! MySQL MCP Server Library
//!
//! This library exposes a fixed set of read-only MySQL operations to AI
//! assistants over line-delimited JSON-RPC (MCP) on stdio.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
