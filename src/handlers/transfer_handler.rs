//! Transfer Handler
//!
//! Moves funds between two accounts as one atomic unit: the transfer
//! record, both ledger entries and both balance increments commit together
//! or not at all.

use std::future::Future;

use tokio::time::Instant;

use crate::config::TransferConfig;
use crate::domain::{Amount, DomainError, OperationContext};
use crate::error::{AppError, AppResult};
use crate::store::{CreateEntryParams, CreateTransferParams, LedgerStore, LedgerTx};

use super::balance::{add_money, BalanceDelta};
use super::{finish, TransferCommand, TransferResult};

// =========================================================================
// TransferHandler
// =========================================================================

/// Handler for transfers between accounts
#[derive(Debug, Clone)]
pub struct TransferHandler<S> {
    store: S,
    config: TransferConfig,
}

impl<S: LedgerStore> TransferHandler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: TransferConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute the transfer command
    ///
    /// Rejects non-positive amounts and self-transfers before touching the
    /// store. A statement that fails with a deadlock re-runs the whole
    /// transaction, at most `max_retries` times.
    pub async fn execute(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> AppResult<TransferResult> {
        let amount = Amount::new(command.amount).map_err(DomainError::from)?;

        if command.from_account_id == command.to_account_id {
            return Err(DomainError::SameAccountTransfer(command.from_account_id).into());
        }

        let deadline = context
            .deadline
            .or_else(|| self.config.timeout.map(|timeout| Instant::now() + timeout));

        let mut attempt = 0;
        loop {
            match self.try_transfer(&command, amount, deadline).await {
                Ok(result) => {
                    tracing::debug!(
                        correlation_id = ?context.correlation_id,
                        "Transfer {} committed: {} -> {} ({})",
                        result.transfer.id,
                        command.from_account_id,
                        command.to_account_id,
                        amount
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        correlation_id = ?context.correlation_id,
                        "Deadlock on transfer {} -> {}, retrying (attempt {}/{}): {}",
                        command.from_account_id,
                        command.to_account_id,
                        attempt,
                        self.config.max_retries,
                        e
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    if e.is_fatal() {
                        tracing::error!(
                            correlation_id = ?context.correlation_id,
                            "Transfer {} -> {} left the transaction in an unknown state: {}",
                            command.from_account_id,
                            command.to_account_id,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One attempt: begin, run every step, then commit or roll back
    async fn try_transfer(
        &self,
        command: &TransferCommand,
        amount: Amount,
        deadline: Option<Instant>,
    ) -> AppResult<TransferResult> {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AppError::DeadlineExceeded);
        }

        let mut tx = within(deadline, self.store.begin())
            .await?
            .map_err(AppError::Transaction)?;

        // on timeout the in-flight statement is dropped and `tx` is rolled back below
        let outcome = within(deadline, transfer_steps(&mut tx, command, amount))
            .await
            .and_then(|steps| steps);

        finish(tx, outcome).await
    }
}

/// Run `fut` until `deadline`, if any
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> AppResult<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AppError::DeadlineExceeded),
        None => Ok(fut.await),
    }
}

async fn transfer_steps<T: LedgerTx>(
    tx: &mut T,
    command: &TransferCommand,
    amount: Amount,
) -> AppResult<TransferResult> {
    let transfer = tx
        .create_transfer(&CreateTransferParams {
            from_account_id: command.from_account_id,
            to_account_id: command.to_account_id,
            amount: amount.value(),
        })
        .await?;

    let from_entry = tx
        .create_entry(&CreateEntryParams {
            account_id: command.from_account_id,
            amount: amount.debit(),
        })
        .await?;

    let to_entry = tx
        .create_entry(&CreateEntryParams {
            account_id: command.to_account_id,
            amount: amount.credit(),
        })
        .await?;

    let (from_account, to_account) = add_money(
        tx,
        BalanceDelta::debit(command.from_account_id, amount),
        BalanceDelta::credit(command.to_account_id, amount),
    )
    .await?;

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;

    #[test]
    fn test_transfer_command() {
        let cmd = TransferCommand::new(1, 2, 30);

        assert_eq!(cmd.from_account_id, 1);
        assert_eq!(cmd.to_account_id, 2);
        assert_eq!(cmd.amount, 30);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount_before_begin() {
        let store = MemoryLedgerStore::new();
        let handler = TransferHandler::new(store.clone());

        for amount in [0, -10] {
            let err = handler
                .execute(TransferCommand::new(1, 2, amount), &OperationContext::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Domain(DomainError::InvalidAmount(_))));
        }
        assert!(store.balance_statements().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_self_transfer() {
        let handler = TransferHandler::new(MemoryLedgerStore::new());

        let err = handler
            .execute(TransferCommand::new(5, 5, 10), &OperationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::SameAccountTransfer(5))));
    }

    #[tokio::test]
    async fn test_expired_deadline_never_begins() {
        let store = MemoryLedgerStore::new();
        let handler = TransferHandler::new(store.clone());
        let context = OperationContext::new().with_deadline(Instant::now());

        let err = handler
            .execute(TransferCommand::new(1, 2, 10), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DeadlineExceeded));
        assert!(store.committed_transfers().is_empty());
    }
}
