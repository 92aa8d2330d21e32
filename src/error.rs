//! Error types for the Daytrack tracker
//!
//! This module provides error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for Daytrack operations
#[derive(Error, Debug)]
pub enum DaytrackError {
    /// Store operation failed (connection, schema, constraint)
    #[error("Database error: {0}")]
    Database(String),

    /// Error raised by the libSQL driver
    #[error("LibSQL error: {0}")]
    Libsql(#[from] libsql::Error),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid goal or achievement ID format
    #[error("Invalid ID: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Date string is not a valid YYYY-MM-DD date
    #[error("Invalid date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    /// Goal not found
    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    /// Invalid operation (e.g., archiving a completed goal)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Daytrack operations
pub type Result<T> = std::result::Result<T, DaytrackError>;

/// Convert anyhow::Error to DaytrackError
impl From<anyhow::Error> for DaytrackError {
    fn from(err: anyhow::Error) -> Self {
        DaytrackError::Other(err.to_string())
    }
}
