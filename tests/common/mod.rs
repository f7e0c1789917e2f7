//! Common test utilities
#![allow(dead_code)]

use ledger_transfer::domain::{Account, Currency};
use ledger_transfer::store::{CreateAccountParams, LedgerStore, LedgerTx, PgLedgerStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to the test database and make sure the ledger tables exist.
///
/// Tests share the database and run in parallel, so nothing is truncated:
/// every test works on accounts it created under a unique owner.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    ledger_transfer::db::apply_schema(&pool)
        .await
        .expect("Failed to apply ledger schema");

    pool
}

/// Owner name no other test run will use
pub fn unique_owner(prefix: &str) -> String {
    format!("{}-{:016x}", prefix, rand::random::<u64>())
}

/// Create and commit a USD account with the given balance
pub async fn create_account(store: &PgLedgerStore, balance: i64) -> Account {
    let mut tx = store.begin().await.expect("Failed to begin");
    let account = tx
        .create_account(&CreateAccountParams {
            owner: unique_owner("test"),
            balance,
            currency: Currency::Usd,
        })
        .await
        .expect("Failed to create account");
    tx.commit().await.expect("Failed to commit");
    account
}

pub async fn balance_of(pool: &PgPool, account_id: i64) -> i64 {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Transfers touching `account_id` on either side
pub async fn count_transfers(pool: &PgPool, account_id: i64) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM transfers WHERE from_account_id = $1 OR to_account_id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count transfers")
}

pub async fn count_entries(pool: &PgPool, account_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count entries")
}

pub async fn entry_sum(pool: &PgPool, account_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM entries WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to sum entries")
}
