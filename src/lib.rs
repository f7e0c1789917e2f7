//! ledger_transfer Library
//!
//! Double-entry ledger with atomic, lock-ordered transfers between accounts.
//! Handlers are generic over a `LedgerStore`; `PgLedgerStore` runs against
//! Postgres and `MemoryLedgerStore` keeps everything in process.

pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod query;
pub mod store;

mod error;

pub use config::{Config, ConfigError, TransferConfig};
pub use error::{AppError, AppResult};
pub use domain::{Account, Amount, AmountError, Currency, DomainError, Entry, OperationContext, Page, Transfer};
pub use handlers::{AccountHandler, CreateAccountCommand, TransferCommand, TransferHandler, TransferResult};
pub use query::QueryService;
pub use store::{LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore, StoreError};
