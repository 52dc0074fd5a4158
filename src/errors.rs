//! # Error Types
//!
//! One typed error for every public table/database operation.
//!
//! Propagation policy: operations catch driver- and pipeline-level failures
//! at their own boundary and re-raise them as a single typed error carrying
//! the operation name with the original message preserved verbatim. No
//! retries, no logging on the caller's behalf.

use thiserror::Error;

/// Result type for all table and database operations
pub type DbResult<T> = Result<T, DbError>;

/// Database errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DbError {
    /// Operation attempted after the database or table was disconnected
    #[error("'{0}' is disconnected")]
    Disconnected(String),

    /// Database or table name not registered
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed caller input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The serialization pipeline rejected a write
    #[error("validation failed for column '{column}': {message}")]
    Validation {
        /// Column that failed validation
        column: String,
        /// Human-readable reason
        message: String,
    },

    /// The storage driver raised; the original message is preserved verbatim
    #[error("driver error in {operation}: {message}")]
    Driver {
        /// Public operation that was executing
        operation: String,
        /// Original driver message
        message: String,
    },

    /// An optional capability the active driver does not support
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl DbError {
    /// Create a validation error for a named column
    pub fn validation(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a driver error for a named operation
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Get the stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Disconnected(_) => "DB_DISCONNECTED",
            Self::NotFound(_) => "DB_NOT_FOUND",
            Self::InvalidArgument(_) => "DB_INVALID_ARGUMENT",
            Self::Validation { .. } => "DB_VALIDATION_FAILED",
            Self::Driver { .. } => "DB_DRIVER_ERROR",
            Self::NotImplemented(_) => "DB_NOT_IMPLEMENTED",
        }
    }

    /// Re-wrap a failure raised below a public operation boundary.
    ///
    /// Caller-fault and lifecycle kinds pass through untouched; anything the
    /// driver raised internally becomes a `Driver` error tagged with the
    /// operation name, original message preserved.
    pub(crate) fn in_operation(self, operation: &str) -> Self {
        match self {
            Self::Disconnected(_)
            | Self::InvalidArgument(_)
            | Self::Validation { .. }
            | Self::NotImplemented(_) => self,
            Self::Driver { message, .. } => Self::driver(operation, message),
            other => Self::driver(operation, other.to_string()),
        }
    }
}
