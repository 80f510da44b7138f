//! Database access layer.
//!
//! This module provides database access functionality:
//! - The `Driver` / `DbConnection` seam and its sqlx MySQL implementation
//! - Session and connection lifecycle management
//! - Schema introspection
//! - Type mappings from MySQL values to JSON

pub mod connection;
pub mod driver;
pub mod mysql;
pub mod schema;
pub mod types;

pub use connection::{ConnectionManager, Lease, LeaseOrigin, Session};
pub use driver::{DbConnection, Driver};
pub use mysql::{MySqlDriver, MySqlHandle};
