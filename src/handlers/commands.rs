//! Command definitions
//!
//! Commands represent intentions to change the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::{Account, Currency, Entry, Transfer};

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move funds between two accounts
///
/// The caller has already checked that both accounts exist, share a
/// currency and that it owns the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Minor units; validated by the handler
    pub amount: i64,
}

impl TransferCommand {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    /// Snapshot after the debit
    pub from_account: Account,
    /// Snapshot after the credit
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

// =========================================================================
// CreateAccountCommand
// =========================================================================

/// Command to open a zero-balance account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub owner: String,
    pub currency: Currency,
}

impl CreateAccountCommand {
    pub fn new(owner: impl Into<String>, currency: Currency) -> Self {
        Self {
            owner: owner.into(),
            currency,
        }
    }
}
