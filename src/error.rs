//! Error types for the MySQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant maps onto one JSON-RPC error code so a caller can tell a rejected
//! request ("not allowed") from an operational failure ("try again").

use rmcp::model::ErrorCode;
use serde_json::json;
use thiserror::Error;

/// Server-defined code for connection failures and timeouts (retryable).
pub const CONNECTION_ERROR_CODE: i32 = -32000;

/// Server-defined code for queries the database refused to run.
pub const QUERY_EXECUTION_ERROR_CODE: i32 = -32001;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a JSON parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid request (malformed envelope) error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a method not found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a permission error.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Timeout { .. } => {
                Some("Retry the request or raise the timeout with --query-timeout")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Retryable errors are also the ones after which the session connection is
    /// considered broken and discarded.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Stable machine-readable category, sent as `error.data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } | Self::InvalidRequest { .. } => "protocol_error",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Permission { .. } => "permission_denied",
            Self::Schema { .. } => "schema_error",
            Self::Connection { .. } | Self::Timeout { .. } => "connection_error",
            Self::Database { .. } => "query_execution_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// JSON-RPC error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } => ErrorCode::PARSE_ERROR,
            Self::InvalidRequest { .. } => ErrorCode::INVALID_REQUEST,
            Self::MethodNotFound { .. } => ErrorCode::METHOD_NOT_FOUND,
            Self::InvalidInput { .. } | Self::Permission { .. } | Self::Schema { .. } => {
                ErrorCode::INVALID_PARAMS
            }
            Self::Connection { .. } | Self::Timeout { .. } => ErrorCode(CONNECTION_ERROR_CODE),
            Self::Database { .. } => ErrorCode(QUERY_EXECUTION_ERROR_CODE),
            Self::Internal { .. } => ErrorCode::INTERNAL_ERROR,
        }
    }
}

/// Convert sqlx errors raised while running statements to DbError.
///
/// Errors raised while opening a connection are classified by the driver instead,
/// since an auth failure arrives as `sqlx::Error::Database` too.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection acquire", 0),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection is closed", "Call connect_db to reconnect")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => {
                DbError::connection("Database worker crashed", "Retry the request")
            }
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Convert DbError to the JSON-RPC error object sent on the wire.
///
/// `data.kind` always carries the category; retryable errors say so explicitly.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let mut data = json!({
            "kind": err.kind(),
            "retryable": err.is_retryable(),
        });
        if let Some(suggestion) = err.suggestion() {
            data["suggestion"] = json!(suggestion);
        }

        let message = match &err {
            DbError::Database {
                message,
                sql_state: Some(code),
                ..
            } => {
                data["sql_state"] = json!(code);
                format!("{} (SQLSTATE: {})", message, code)
            }
            _ => err.to_string(),
        };

        rmcp::ErrorData::new(err.code(), message, Some(data))
    }
}
