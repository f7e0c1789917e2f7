//! Query module
//!
//! Read-side access to committed ledger rows.

mod service;

pub use service::QueryService;
