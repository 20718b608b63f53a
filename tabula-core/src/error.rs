//! Error types for database collaborators

use thiserror::Error;

/// Errors surfaced by a [`crate::Database`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DbError {
    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Expected exactly one row, got {got}")]
    UnexpectedRowCount { got: usize },

    #[error("Cannot bind value for parameter ${index}: {reason}")]
    Bind { index: usize, reason: String },

    #[error("Cannot decode column {column}: {reason}")]
    Decode { column: String, reason: String },

    #[error("Connection unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
