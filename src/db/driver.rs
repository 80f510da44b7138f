//! Database driver abstraction.
//!
//! The connection manager only needs a handful of primitives from a live
//! connection. Keeping them behind `Driver` / `DbConnection` lets the session
//! lifecycle be exercised without a MySQL server.

use crate::config::Timeouts;
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, ConnectionConfig, QueryResult, TableEntry};
use std::future::Future;

/// Opens connections for a given configuration.
pub trait Driver: Send + Sync {
    type Connection: DbConnection;

    /// Open a fully initialized connection.
    ///
    /// Implementations must honor `timeouts.connect` and report every failure
    /// (auth, unreachable host, timeout) as a retryable connection error.
    fn connect(
        &self,
        config: &ConnectionConfig,
        timeouts: &Timeouts,
    ) -> impl Future<Output = DbResult<Self::Connection>> + Send;
}

/// A single live database connection.
///
/// Every statement method is bounded by the query timeout the connection was
/// opened with.
pub trait DbConnection: Send {
    /// Lightweight round trip used by the liveness check.
    fn ping(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Close the connection gracefully. Errors are logged, not returned.
    fn close(self) -> impl Future<Output = ()> + Send;

    /// Server version reported at connect time.
    fn server_version(&self) -> Option<String>;

    /// Databases visible to the connected user, in server order.
    fn list_databases(&mut self) -> impl Future<Output = DbResult<Vec<String>>> + Send;

    /// Tables and views in the connection's current database, in server order.
    fn list_tables(&mut self) -> impl Future<Output = DbResult<Vec<TableEntry>>> + Send;

    /// Column metadata for `table` in the current database, in declared order.
    fn describe_table(
        &mut self,
        table: &str,
    ) -> impl Future<Output = DbResult<Vec<ColumnDescriptor>>> + Send;

    /// Run a statement that already passed the read-only gate and fetch every row.
    fn fetch_all(&mut self, sql: &str) -> impl Future<Output = DbResult<QueryResult>> + Send;
}
