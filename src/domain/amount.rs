//! Amount type
//!
//! Domain primitive for transfer amounts, expressed in the smallest
//! currency unit (cents for USD/EUR). Validated at construction time, so a
//! non-positive amount can never reach the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Its negation is always representable, so a debit entry never overflows
///
/// # Example
/// ```
/// use ledger_transfer::domain::Amount;
///
/// let amount = Amount::new(30).unwrap();
/// assert_eq!(amount.value(), 30);
/// assert_eq!(amount.debit(), -30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying value in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Signed delta applied to the source account.
    pub fn debit(&self) -> i64 {
        -self.0
    }

    /// Signed delta applied to the destination account.
    pub fn credit(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
