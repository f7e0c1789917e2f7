//! Command Handlers module
//!
//! Handlers that change the ledger. Each one owns a store handle, opens a
//! transaction per command and either commits it or rolls it back.

mod account_handler;
pub mod balance;
mod commands;
mod transfer_handler;


pub use account_handler::AccountHandler;
pub use commands::*;
pub use transfer_handler::TransferHandler;

use crate::error::{AppError, AppResult};
use crate::store::LedgerTx;

/// Commit `tx` if `result` is Ok, otherwise roll it back.
///
/// A constraint rejected at commit is reported like one rejected by a
/// statement. A failed rollback is reported as `AppError::RollbackFailed`
/// carrying both the original cause and the rollback error.
pub(crate) async fn finish<T: LedgerTx, R>(tx: T, result: AppResult<R>) -> AppResult<R> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                if e.is_unique_violation() {
                    AppError::from(e)
                } else {
                    AppError::Transaction(e)
                }
            })?;
            Ok(value)
        }
        Err(cause) => match tx.rollback().await {
            Ok(()) => Err(cause),
            Err(rollback) => {
                tracing::error!("Rollback failed after error ({}): {}", cause, rollback);
                Err(AppError::RollbackFailed {
                    cause: Box::new(cause),
                    rollback,
                })
            }
        },
    }
}
