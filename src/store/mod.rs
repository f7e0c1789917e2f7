//! Ledger Store module
//!
//! Capability traits for the account ledger and transfer record tables.
//! A `LedgerStore` opens transactions; every row operation runs on the
//! returned `LedgerTx` and becomes visible to others only after `commit`.
//! Dropping a `LedgerTx` without committing rolls it back.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Account, Currency, Entry, Page, Transfer};

pub use error::StoreError;
pub use memory::{BalanceStatement, FailPoint, MemoryLedgerStore, MemoryLedgerTx};
pub use postgres::{PgLedgerStore, PgLedgerTx};

/// Store-level Result type
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: Currency,
}

/// Administrative balance overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAccountParams {
    pub id: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAccountsParams {
    /// Restrict to one owner when set
    pub owner: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListAccountsParams {
    pub fn new(owner: Option<String>, page: Page) -> Self {
        Self {
            owner,
            limit: page.limit(),
            offset: page.offset(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntriesParams {
    pub account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

impl ListEntriesParams {
    pub fn new(account_id: i64, page: Page) -> Self {
        Self {
            account_id,
            limit: page.limit(),
            offset: page.offset(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Transfers where the account is either side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTransfersParams {
    pub account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

impl ListTransfersParams {
    pub fn new(account_id: i64, page: Page) -> Self {
        Self {
            account_id,
            limit: page.limit(),
            offset: page.offset(),
        }
    }
}

/// Transaction factory
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    /// Open a new transaction
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// Row operations inside one open transaction
#[async_trait]
pub trait LedgerTx: Send {
    // --- accounts ---

    async fn create_account(&mut self, params: &CreateAccountParams) -> StoreResult<Account>;

    async fn get_account(&mut self, id: i64) -> StoreResult<Account>;

    /// Account with this id whose currency matches, or `NotFound`
    async fn get_account_with_currency(
        &mut self,
        id: i64,
        currency: Currency,
    ) -> StoreResult<Account>;

    /// Overwrite a balance. Administrative path: records no entry.
    async fn update_account(&mut self, params: &UpdateAccountParams) -> StoreResult<Account>;

    async fn list_accounts(&mut self, params: &ListAccountsParams) -> StoreResult<Vec<Account>>;

    async fn delete_account(&mut self, id: i64) -> StoreResult<()>;

    /// Add `amount` to the balance in one read-modify-write statement and
    /// return the updated row. The row stays locked until the transaction ends.
    async fn add_account_balance(&mut self, id: i64, amount: i64) -> StoreResult<Account>;

    // --- entries ---

    async fn create_entry(&mut self, params: &CreateEntryParams) -> StoreResult<Entry>;

    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry>;

    async fn list_entries(&mut self, params: &ListEntriesParams) -> StoreResult<Vec<Entry>>;

    // --- transfers ---

    async fn create_transfer(&mut self, params: &CreateTransferParams) -> StoreResult<Transfer>;

    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer>;

    async fn list_transfers(&mut self, params: &ListTransfersParams) -> StoreResult<Vec<Transfer>>;

    // --- lifecycle ---

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
