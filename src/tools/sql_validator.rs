//! SQL statement validation for read-only enforcement.
//!
//! This is a gate, not a parser: a statement is accepted when it is a single
//! statement whose leading keyword is on a fixed allow-list. The body is never
//! inspected or rewritten. Every connection additionally runs in a read-only
//! session, so the gate is not the only line of defense.

use crate::error::DbError;
use thiserror::Error;

/// Leading keywords a query may start with.
pub const ALLOWED_COMMANDS: [&str; 5] = ["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

/// Statement separator.
const TERMINATOR: char = ';';

/// Reason a query was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Query is empty")]
    Empty,

    #[error("Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Command '{command}' is not allowed. Only read-only queries are allowed")]
    DisallowedCommand { command: String },
}

impl Rejection {
    /// The operation named in the permission error.
    fn operation(&self) -> String {
        match self {
            Self::Empty => "EMPTY".to_string(),
            Self::MultipleStatements => "MULTI-STATEMENT".to_string(),
            Self::DisallowedCommand { command } => command.clone(),
        }
    }
}

impl From<Rejection> for DbError {
    fn from(rejection: Rejection) -> Self {
        DbError::permission(
            rejection.operation(),
            format!(
                "{}. Allowed commands: {}",
                rejection,
                ALLOWED_COMMANDS.join(", ")
            ),
        )
    }
}

/// Validate SQL for read-only execution.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::tools::sql_validator::{validate_readonly, Rejection};
///
/// assert!(validate_readonly("  explain SELECT * FROM users").is_ok());
/// assert_eq!(
///     validate_readonly("SELECT 1; DROP TABLE users"),
///     Err(Rejection::MultipleStatements)
/// );
/// ```
pub fn validate_readonly(sql: &str) -> Result<(), Rejection> {
    let trimmed = sql.trim();
    let statement = trimmed
        .strip_suffix(TERMINATOR)
        .map(str::trim_end)
        .unwrap_or(trimmed);

    if statement.contains(TERMINATOR) {
        return Err(Rejection::MultipleStatements);
    }

    let first = statement
        .split_whitespace()
        .next()
        .ok_or(Rejection::Empty)?
        .to_uppercase();

    if ALLOWED_COMMANDS.contains(&first.as_str()) {
        Ok(())
    } else {
        Err(Rejection::DisallowedCommand { command: first })
    }
}
