//! Account Handler
//!
//! Opens accounts and performs the administrative account writes.

use crate::domain::{Account, OperationContext};
use crate::error::{AppError, AppResult};
use crate::store::{CreateAccountParams, LedgerStore, LedgerTx, UpdateAccountParams};

use super::{finish, CreateAccountCommand};

/// Handler for account lifecycle commands
#[derive(Debug, Clone)]
pub struct AccountHandler<S> {
    store: S,
}

impl<S: LedgerStore> AccountHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Open a zero-balance account.
    ///
    /// A second account with the same owner and currency fails with
    /// `AppError::UniqueViolation`.
    pub async fn create_account(
        &self,
        command: CreateAccountCommand,
        context: &OperationContext,
    ) -> AppResult<Account> {
        let mut tx = self.store.begin().await.map_err(AppError::Transaction)?;
        let result = tx
            .create_account(&CreateAccountParams {
                owner: command.owner,
                balance: 0,
                currency: command.currency,
            })
            .await
            .map_err(AppError::from);
        let account = finish(tx, result).await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            "Account {} created for {} ({})",
            account.id,
            account.owner,
            account.currency
        );
        Ok(account)
    }

    /// Overwrite a balance without recording an entry. Administrative only.
    pub async fn set_balance(&self, id: i64, balance: i64) -> AppResult<Account> {
        let mut tx = self.store.begin().await.map_err(AppError::Transaction)?;
        let result = tx
            .update_account(&UpdateAccountParams { id, balance })
            .await
            .map_err(|e| AppError::lookup(e, "Account", id));
        let account = finish(tx, result).await?;

        tracing::warn!("Balance of account {} overwritten to {}", id, balance);
        Ok(account)
    }

    /// Remove an account that has no entries or transfers. Administrative only.
    pub async fn delete_account(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await.map_err(AppError::Transaction)?;
        let result = tx
            .delete_account(id)
            .await
            .map_err(|e| AppError::lookup(e, "Account", id));
        finish(tx, result).await?;

        tracing::info!("Account {} deleted", id);
        Ok(())
    }
}
