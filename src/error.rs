//! Error types for sqlscope.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Connection and query errors carry enough context (dialect, failing statement) for
//! the caller to show an actionable message without inspecting the driver error.

use crate::models::Dialect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("validation error: {field} must not be empty")]
    Validation { field: &'static str },

    #[error("unsupported dialect: {input}")]
    UnsupportedDialect { input: String },

    #[error("validate {dialect} dsn: {message}")]
    InvalidDsn { dialect: Dialect, message: String },

    #[error("connect to {dialect}: {message}")]
    Connection {
        dialect: Dialect,
        message: String,
        suggestion: String,
    },

    #[error("{context}: {message}")]
    Query {
        /// e.g., "get columns of users"
        context: String,
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("timeout: {operation} exceeded {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("close pool connections: {}", failures.join("; "))]
    Close { failures: Vec<String> },

    #[error("connection registry: {message}")]
    Registry { message: String },
}

impl DbError {
    /// Create a validation error for an empty required field.
    pub fn validation(field: &'static str) -> Self {
        Self::Validation { field }
    }

    /// Create an unsupported dialect error.
    pub fn unsupported_dialect(input: impl Into<String>) -> Self {
        Self::UnsupportedDialect {
            input: input.into(),
        }
    }

    /// Create a DSN parse error for a dialect.
    pub fn invalid_dsn(dialect: Dialect, message: impl Into<String>) -> Self {
        Self::InvalidDsn {
            dialect,
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(
        dialect: Dialect,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Connection {
            dialect,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(
        context: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self::Query {
            context: context.into(),
            message: message.into(),
            sql_state,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    /// Create a registry persistence error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Wrap a driver error with the query context it happened in.
    pub fn from_sqlx(context: impl Into<String>, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::query(context, db_err.message(), code)
            }
            other => DbError::query(context, other.to_string(), None),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Validation { .. } => Some("Provide both a connection name and a DSN"),
            Self::UnsupportedDialect { .. } => Some(
                "Use a postgres:// URL, a MySQL DSN (user:pass@tcp(host:port)/db) or a path to a .db file",
            ),
            _ => None,
        }
    }
}

/// Convert registry file I/O errors to DbError.
impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::registry(format!("I/O error: {}", err))
    }
}

/// Convert registry encoding errors to DbError.
impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::registry(format!("encode/decode: {}", err))
    }
}

/// Result type alias for engine operations.
pub type DbResult<T> = Result<T, DbError>;
