//! Postgres Ledger Store
//!
//! Production implementation of the store capability on top of a sqlx
//! connection pool. Every statement runs on the open transaction, so row
//! locks taken by `UPDATE ... RETURNING` are held until commit or rollback.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{Account, Currency, Entry, Transfer};

use super::{
    CreateAccountParams, CreateEntryParams, CreateTransferParams, LedgerStore, LedgerTx,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, StoreError, StoreResult,
    UpdateAccountParams,
};

/// Ledger store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new store with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> StoreResult<PgLedgerTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }
}

/// An open Postgres transaction
#[derive(Debug)]
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn create_account(&mut self, params: &CreateAccountParams) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(&params.owner)
        .bind(params.balance)
        .bind(params.currency.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(account)
    }

    async fn get_account_with_currency(
        &mut self,
        id: i64,
        currency: Currency,
    ) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1 AND currency = $2
            "#,
        )
        .bind(id)
        .bind(currency.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(account)
    }

    async fn update_account(&mut self, params: &UpdateAccountParams) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = $2
            WHERE id = $1
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(params.id)
        .bind(params.balance)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(account)
    }

    async fn list_accounts(&mut self, params: &ListAccountsParams) -> StoreResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE ($1::text IS NULL OR owner = $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(params.owner.as_deref())
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(accounts)
    }

    async fn delete_account(&mut self, id: i64) -> StoreResult<()> {
        let rows_affected = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_account_balance(&mut self, id: i64, amount: i64) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance + $1
            WHERE id = $2
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(amount)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(account)
    }

    async fn create_entry(&mut self, params: &CreateEntryParams) -> StoreResult<Entry> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(params.account_id)
        .bind(params.amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry> {
        let entry = sqlx::query_as::<_, Entry>(
            "SELECT id, account_id, amount, created_at FROM entries WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry)
    }

    async fn list_entries(&mut self, params: &ListEntriesParams) -> StoreResult<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, account_id, amount, created_at
            FROM entries
            WHERE account_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(params.account_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(entries)
    }

    async fn create_transfer(&mut self, params: &CreateTransferParams) -> StoreResult<Transfer> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(params.from_account_id)
        .bind(params.to_account_id)
        .bind(params.amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(transfer)
    }

    async fn list_transfers(&mut self, params: &ListTransfersParams) -> StoreResult<Vec<Transfer>> {
        let transfers = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE from_account_id = $1 OR to_account_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(params.account_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(transfers)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
