//! Integration tests for the session / connection lifecycle.

mod common;

use common::{MockDriver, SERVER_VERSION, manager, valid_config};
use mysql_mcp_server::db::LeaseOrigin;
use mysql_mcp_server::error::{DbError, DbResult};
use mysql_mcp_server::models::ConnectionConfig;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_connect_installs_session() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert!(!manager.is_connected());

    let info = assert_ok!(manager.connect(valid_config(Some("shop"))).await);
    assert_eq!(info.database.as_deref(), Some("shop"));
    assert_eq!(info.server_version.as_deref(), Some(SERVER_VERSION));
    assert!(manager.is_connected());
    assert_eq!(manager.default_database(), Some("shop"));
}

#[tokio::test]
async fn test_reconnect_replaces_and_closes_old_connection() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);

    assert_ok!(manager.connect(valid_config(Some("shop"))).await);
    assert_ok!(manager.connect(valid_config(Some("analytics"))).await);

    assert_eq!(manager.default_database(), Some("analytics"));
    let state = driver.state();
    assert_eq!(state.connects, 2);
    assert_eq!(state.closes, 1);
}

#[tokio::test]
async fn test_failed_connect_leaves_session_disconnected() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    let bad = ConnectionConfig::new("localhost", 3306, "reader", "wrong", Some("shop".into()));
    let err = assert_err!(manager.connect(bad).await);
    assert!(err.is_retryable());

    assert!(!manager.is_connected());
    assert_eq!(manager.default_database(), None);
    assert!(manager.current_config().is_none());
    // The previous connection was closed before the attempt
    assert_eq!(driver.state().closes, 1);
}

#[tokio::test]
async fn test_ensure_connected_uses_defaults() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, Some(valid_config(Some("shop"))));

    assert_ok!(manager.ensure_connected().await);
    assert!(manager.is_connected());
    assert_eq!(manager.default_database(), Some("shop"));

    // Already connected: only a ping
    assert_ok!(manager.ensure_connected().await);
    let state = driver.state();
    assert_eq!(state.connects, 1);
    assert_eq!(state.pings, 1);
}

#[tokio::test]
async fn test_ensure_connected_without_settings_points_to_connect_db() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);

    let err = assert_err!(manager.ensure_connected().await);
    assert!(matches!(err, DbError::Connection { .. }));
    assert!(err.suggestion().unwrap().contains("connect_db"));
    assert_eq!(driver.state().connect_attempts, 0);
}

#[tokio::test]
async fn test_ensure_connected_with_invalid_defaults() {
    let driver = MockDriver::new();
    let defaults = ConnectionConfig::new("unreachable", 3306, "reader", "secret", None);
    let mut manager = manager(&driver, Some(defaults));

    let err = assert_err!(manager.ensure_connected().await);
    assert!(err.is_retryable());
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_failed_ping_reconnects_once() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    driver.state().fail_next_ping = true;
    assert_ok!(manager.ensure_connected().await);

    assert!(manager.is_connected());
    assert_eq!(manager.default_database(), Some("shop"));
    let state = driver.state();
    assert_eq!(state.connects, 2);
    assert_eq!(state.closes, 1);
}

#[tokio::test]
async fn test_failed_reconnect_is_reported_not_retried() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    {
        let mut state = driver.state();
        state.fail_next_ping = true;
        state.refuse_connections = true;
    }
    let err = assert_err!(manager.ensure_connected().await);
    assert!(matches!(err, DbError::Connection { .. }));
    assert!(!manager.is_connected());
    // One initial connect plus exactly one reconnect attempt
    assert_eq!(driver.state().connect_attempts, 2);
}

#[tokio::test]
async fn test_failed_reconnect_keeps_explicit_connection_settings() {
    let driver = MockDriver::new();
    let defaults = ConnectionConfig::new(
        "env-default-host",
        3306,
        "reader",
        "secret",
        Some("analytics".into()),
    );
    let mut manager = manager(&driver, Some(defaults));
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    {
        let mut state = driver.state();
        state.fail_next_ping = true;
        state.refuse_connections = true;
    }
    assert_err!(manager.ensure_connected().await);

    let config = manager.current_config().unwrap();
    assert_eq!(config.host, "localhost");
    assert_eq!(config.database.as_deref(), Some("shop"));
    assert_eq!(manager.default_database(), Some("shop"));

    // Once the server is back, the session reconnects to the same place
    driver.state().refuse_connections = false;
    assert_ok!(manager.ensure_connected().await);
    assert!(manager.is_connected());
    assert_eq!(manager.current_config().unwrap().host, "localhost");
    assert_eq!(manager.default_database(), Some("shop"));
    let state = driver.state();
    assert_eq!(state.connect_attempts, 3);
    assert_eq!(state.connects, 2);
}

#[tokio::test]
async fn test_override_uses_transient_connection() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    let lease = assert_ok!(manager.acquire(Some("analytics")).await);
    assert_eq!(lease.origin(), LeaseOrigin::Transient);
    assert_eq!(lease.database(), Some("analytics"));
    // The session connection stays in place while the transient one is out
    assert!(manager.is_connected());

    let outcome: DbResult<()> = Ok(());
    manager.release(lease, &outcome).await;

    assert_eq!(manager.default_database(), Some("shop"));
    assert!(manager.is_connected());
    assert_eq!(driver.state().closes, 1);
}

#[tokio::test]
async fn test_override_matching_default_uses_session() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    let lease = assert_ok!(manager.acquire(Some("shop")).await);
    assert_eq!(lease.origin(), LeaseOrigin::Session);
    assert!(!manager.is_connected());

    let outcome: DbResult<()> = Ok(());
    manager.release(lease, &outcome).await;
    assert!(manager.is_connected());
    assert_eq!(driver.state().connects, 1);
}

#[tokio::test]
async fn test_connection_failure_discards_session_connection() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    let lease = assert_ok!(manager.acquire(None).await);
    let outcome: DbResult<()> = Err(DbError::timeout("query execution", 30));
    manager.release(lease, &outcome).await;

    assert!(!manager.is_connected());
    // Config is kept so the next call reconnects
    assert_eq!(manager.current_config().unwrap().database.as_deref(), Some("shop"));
    assert_ok!(manager.ensure_connected().await);
    assert_eq!(driver.state().connects, 2);
}

#[tokio::test]
async fn test_query_failure_keeps_session_connection() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(None)).await);

    let lease = assert_ok!(manager.acquire(None).await);
    let outcome: DbResult<()> = Err(DbError::database("syntax error", None, "check"));
    manager.release(lease, &outcome).await;

    assert!(manager.is_connected());
    assert_eq!(driver.state().closes, 0);
}

#[tokio::test]
async fn test_disconnect_resets_session() {
    let driver = MockDriver::new();
    let mut manager = manager(&driver, None);
    assert_ok!(manager.connect(valid_config(Some("shop"))).await);

    manager.disconnect().await;
    assert!(!manager.is_connected());
    assert_eq!(manager.default_database(), None);
    assert!(manager.current_config().is_none());
    assert_eq!(driver.state().closes, 1);
}
