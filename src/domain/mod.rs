//! Domain module
//!
//! Core domain types: ledger rows, validated amounts and the operation context.

pub mod amount;
pub mod context;
pub mod currency;
pub mod error;
pub mod models;
pub mod page;

pub use amount::{Amount, AmountError};
pub use context::OperationContext;
pub use currency::Currency;
pub use error::DomainError;
pub use models::{Account, Entry, Transfer};
pub use page::Page;
