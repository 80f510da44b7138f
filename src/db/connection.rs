//! Connection lifecycle management.
//!
//! The `ConnectionManager` owns the process-wide [`Session`]: at most one live
//! connection, the configuration it was opened with, and the default database.
//! Handlers never keep a connection across requests; they take a [`Lease`] for
//! the duration of one call and hand it back through [`ConnectionManager::release`].

use crate::config::Timeouts;
use crate::db::driver::{DbConnection, Driver};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, ConnectionInfo};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, warn};

/// Process-wide connection state.
#[derive(Debug)]
pub struct Session<C> {
    connection: Option<C>,
    /// Last configuration a connection was successfully opened with.
    config: Option<ConnectionConfig>,
    default_database: Option<String>,
}

impl<C> Session<C> {
    fn empty() -> Self {
        Self {
            connection: None,
            config: None,
            default_database: None,
        }
    }
}

/// Where a leased connection came from, and therefore where it goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOrigin {
    /// The session connection, returned to the session on release.
    Session,
    /// Opened for a single call with a database override; closed on release.
    Transient,
}

/// A connection borrowed by exactly one handler call.
#[derive(Debug)]
pub struct Lease<C> {
    connection: C,
    origin: LeaseOrigin,
    database: Option<String>,
}

impl<C> Lease<C> {
    pub fn origin(&self) -> LeaseOrigin {
        self.origin
    }

    /// Database the leased connection operates on.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl<C> Deref for Lease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C> DerefMut for Lease<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

pub struct ConnectionManager<D: Driver> {
    driver: D,
    timeouts: Timeouts,
    /// Environment-sourced settings used for lazy connect.
    defaults: Option<ConnectionConfig>,
    session: Session<D::Connection>,
}

impl<D: Driver> ConnectionManager<D> {
    /// Create a manager with an empty session.
    pub fn new(driver: D, timeouts: Timeouts, defaults: Option<ConnectionConfig>) -> Self {
        Self {
            driver,
            timeouts,
            defaults,
            session: Session::empty(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.connection.is_some()
    }

    /// The session's default database.
    pub fn default_database(&self) -> Option<&str> {
        self.session.default_database.as_deref()
    }

    /// Configuration of the current (or last successfully opened) session connection.
    pub fn current_config(&self) -> Option<&ConnectionConfig> {
        self.session.config.as_ref()
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Replace the session connection with a new one opened from `config`.
    ///
    /// The existing connection is closed first. On failure the session is left
    /// fully disconnected.
    pub async fn connect(&mut self, config: ConnectionConfig) -> DbResult<ConnectionInfo> {
        self.disconnect().await;

        info!(endpoint = %config.endpoint(), "Connecting to MySQL");
        let connection = self.driver.connect(&config, &self.timeouts).await?;
        let info = ConnectionInfo::new(&config, connection.server_version());

        // Only a fully opened connection is ever stored
        self.session = Session {
            connection: Some(connection),
            default_database: config.database.clone(),
            config: Some(config),
        };

        info!(
            server_version = info.server_version.as_deref().unwrap_or("unknown"),
            database = info.database.as_deref().unwrap_or("<none>"),
            "Connected to MySQL"
        );
        Ok(info)
    }

    /// Make sure the session holds a live connection.
    ///
    /// An existing connection is pinged first; if the ping fails, exactly one
    /// reconnect is attempted. Reconnects reuse the session configuration and keep
    /// it even when they fail, so only `connect` changes which server and default
    /// database the session points at. The startup defaults are used only while
    /// the session has no configuration at all.
    pub async fn ensure_connected(&mut self) -> DbResult<()> {
        if let Some(connection) = self.session.connection.as_mut() {
            let ping = tokio::time::timeout(self.timeouts.connect, connection.ping()).await;
            let failure = match ping {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e,
                Err(_) => DbError::timeout("liveness ping", self.timeouts.connect.as_secs()),
            };

            warn!(error = %failure, "Session connection failed liveness check, reconnecting once");
            if let Some(stale) = self.session.connection.take() {
                stale.close().await;
            }
        }

        if let Some(config) = self.session.config.as_ref() {
            debug!(endpoint = %config.endpoint(), "Reconnecting session");
            let connection = self.driver.connect(config, &self.timeouts).await?;
            self.session.connection = Some(connection);
            return Ok(());
        }

        let config = self.defaults.clone().ok_or_else(|| {
            DbError::connection(
                "No connection established and no default connection settings are configured",
                "Call connect_db first, or set MYSQL_HOST, MYSQL_USER and MYSQL_PASSWORD",
            )
        })?;

        debug!(endpoint = %config.endpoint(), "Lazy connect");
        self.connect(config).await.map(|_| ())
    }

    /// Lease a connection for one tool call.
    ///
    /// Without an override, or with one equal to the session default, the session
    /// connection is leased. Any other database gets a transient connection opened
    /// from the session configuration, so the session default never changes.
    pub async fn acquire(&mut self, database: Option<&str>) -> DbResult<Lease<D::Connection>> {
        self.ensure_connected().await?;

        let override_db = database.filter(|db| Some(*db) != self.default_database());
        if let Some(db) = override_db {
            let base = self.session.config.as_ref().ok_or_else(|| {
                DbError::internal("Session connected without a configuration")
            })?;
            let config = base.with_database(db);
            debug!(database = %db, "Opening transient connection for database override");
            let connection = self.driver.connect(&config, &self.timeouts).await?;
            return Ok(Lease {
                connection,
                origin: LeaseOrigin::Transient,
                database: Some(db.to_string()),
            });
        }

        let connection = self.session.connection.take().ok_or_else(|| {
            DbError::connection(
                "Session connection is not available",
                "Retry the request or call connect_db",
            )
        })?;
        Ok(Lease {
            connection,
            origin: LeaseOrigin::Session,
            database: self.session.default_database.clone(),
        })
    }

    /// Return a lease after the call that used it has finished.
    ///
    /// Transient connections are always closed. The session connection is put
    /// back unless the call failed with a connection-class error, in which case
    /// it is closed and the next call reconnects.
    pub async fn release<T>(&mut self, lease: Lease<D::Connection>, outcome: &DbResult<T>) {
        let failed = matches!(outcome, Err(e) if e.is_retryable());
        match lease.origin {
            LeaseOrigin::Transient => lease.connection.close().await,
            LeaseOrigin::Session if failed => {
                warn!("Discarding session connection after connection failure");
                lease.connection.close().await;
            }
            LeaseOrigin::Session => {
                if let Some(replaced) = self.session.connection.replace(lease.connection) {
                    replaced.close().await;
                }
            }
        }
    }

    /// Close the session connection and forget its configuration.
    pub async fn disconnect(&mut self) {
        let session = std::mem::replace(&mut self.session, Session::empty());
        if let Some(connection) = session.connection {
            info!("Closing MySQL connection");
            connection.close().await;
        }
    }
}
