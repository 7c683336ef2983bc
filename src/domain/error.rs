//! Error types for the ledger service.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
}

/// Errors raised by the event store and holdings collaborators
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The store could not be reached (pool exhausted, connection refused, I/O)
    #[error("Store unavailable: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Connection(err.to_string()),
            sqlx::Error::RowNotFound => Self::NotFound(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Decode(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::from(err))
    }
}

/// Request validation failures
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange { start: String, end: String },

    #[error("Unknown granularity '{0}', expected one of: daily, weekly, monthly")]
    UnknownGranularity(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error(
        "Range spans {points} {granularity} buckets, more than the limit of {max}; narrow the range or use a coarser interval"
    )]
    TooManyPoints {
        points: u64,
        max: u64,
        granularity: String,
    },

    #[error("{0}")]
    Multiple(String),
}
