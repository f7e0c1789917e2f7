//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::AmountError;

/// Domain-specific errors
///
/// Contract violations detected before any store work begins.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid amount (zero or negative)
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Transfer to same account
    #[error("Cannot transfer to the same account: {0}")]
    SameAccountTransfer(i64),

    /// Unsupported currency code
    #[error("Unsupported currency: {0}")]
    InvalidCurrency(String),

    /// Page parameters out of range
    #[error("Invalid page: {0}")]
    InvalidPage(String),
}
