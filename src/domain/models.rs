//! Ledger rows
//!
//! Accounts hold balances; entries and transfers are the append-only audit
//! trail. Balances and amounts are signed minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A balance-holding account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// One signed side of a transfer against one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    /// Negative for debit, positive for credit
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Record of one completed movement of funds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}
