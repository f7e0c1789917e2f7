//! Store Errors
//!
//! Error types for ledger store operations. Postgres errors are classified
//! by SQLSTATE so callers never inspect driver-specific codes.

/// unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";
/// serialization_failure
const SERIALIZATION_FAILURE: &str = "40001";

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("no rows in result set")]
    NotFound,

    /// Unique or foreign-key constraint rejected the write
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// The store aborted the statement to break a lock cycle
    #[error("deadlock detected: {0}")]
    Deadlock(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Failure reported by a non-SQL backend
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if retrying the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Deadlock(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::RowNotFound => Some(StoreError::NotFound),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                    Some(StoreError::UniqueViolation(db_err.message().to_string()))
                }
                Some(DEADLOCK_DETECTED) | Some(SERIALIZATION_FAILURE) => {
                    Some(StoreError::Deadlock(db_err.message().to_string()))
                }
                _ => None,
            },
            _ => None,
        };

        classified.unwrap_or(StoreError::Database(err))
    }
}
