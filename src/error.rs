//! Error handling module
//!
//! Centralized error types surfaced by the handlers. Mapping these to user
//! facing responses belongs to the request layer.

use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Contract errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Propagated store errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A statement inside the transaction failed
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Begin or commit failed
    #[error("Transaction failure: {0}")]
    Transaction(StoreError),

    /// Rolling back after `cause` failed too; the transaction's final state is unknown
    #[error("tx err: {cause}, rb err: {rollback}")]
    RollbackFailed {
        cause: Box<AppError>,
        rollback: StoreError,
    },

    #[error("Deadline exceeded before the transaction completed")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(err.to_string()),
            StoreError::UniqueViolation(msg) => AppError::UniqueViolation(msg),
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    /// Convert a store error from a lookup of `what` `id`, naming the row
    /// when it was missing
    pub(crate) fn lookup(err: StoreError, what: &str, id: i64) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(format!("{} {} not found", what, id)),
            other => other.into(),
        }
    }

    /// Check if re-running the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_retryable())
    }

    /// Check if the caller must treat data integrity as unknown
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::RollbackFailed { .. })
    }
}
