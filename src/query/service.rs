//! Query Service
//!
//! Read side of the ledger. Each query runs in its own short transaction,
//! so it sees only committed rows.

use crate::domain::{Account, Currency, Entry, Page, Transfer};
use crate::error::{AppError, AppResult};
use crate::handlers::finish;
use crate::store::{
    LedgerStore, LedgerTx, ListAccountsParams, ListEntriesParams, ListTransfersParams,
};

/// Query Service for reading accounts, entries and transfers
#[derive(Debug, Clone)]
pub struct QueryService<S> {
    store: S,
}

impl<S: LedgerStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_account(&self, id: i64) -> AppResult<Account> {
        let mut tx = self.begin().await?;
        let result = tx
            .get_account(id)
            .await
            .map_err(|e| AppError::lookup(e, "Account", id));
        finish(tx, result).await
    }

    /// Account `id` in `currency`, or `NotFound`. Used by the request layer
    /// to validate both sides of a transfer before calling the handler.
    pub async fn get_account_with_currency(
        &self,
        id: i64,
        currency: Currency,
    ) -> AppResult<Account> {
        let mut tx = self.begin().await?;
        let result = tx
            .get_account_with_currency(id, currency)
            .await
            .map_err(|e| AppError::lookup(e, &format!("{} account", currency), id));
        finish(tx, result).await
    }

    pub async fn list_accounts(&self, owner: Option<String>, page: Page) -> AppResult<Vec<Account>> {
        let mut tx = self.begin().await?;
        let result = tx
            .list_accounts(&ListAccountsParams::new(owner, page))
            .await
            .map_err(AppError::from);
        finish(tx, result).await
    }

    pub async fn get_entry(&self, id: i64) -> AppResult<Entry> {
        let mut tx = self.begin().await?;
        let result = tx
            .get_entry(id)
            .await
            .map_err(|e| AppError::lookup(e, "Entry", id));
        finish(tx, result).await
    }

    pub async fn list_entries(&self, account_id: i64, page: Page) -> AppResult<Vec<Entry>> {
        let mut tx = self.begin().await?;
        let result = tx
            .list_entries(&ListEntriesParams::new(account_id, page))
            .await
            .map_err(AppError::from);
        finish(tx, result).await
    }

    pub async fn get_transfer(&self, id: i64) -> AppResult<Transfer> {
        let mut tx = self.begin().await?;
        let result = tx
            .get_transfer(id)
            .await
            .map_err(|e| AppError::lookup(e, "Transfer", id));
        finish(tx, result).await
    }

    /// Transfers where `account_id` is the source or the destination
    pub async fn list_transfers(&self, account_id: i64, page: Page) -> AppResult<Vec<Transfer>> {
        let mut tx = self.begin().await?;
        let result = tx
            .list_transfers(&ListTransfersParams::new(account_id, page))
            .await
            .map_err(AppError::from);
        finish(tx, result).await
    }

    async fn begin(&self) -> AppResult<S::Tx> {
        self.store.begin().await.map_err(AppError::Transaction)
    }
}
