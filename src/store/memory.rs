//! In-memory Ledger Store
//!
//! A transactional store kept in process memory. It behaves like the
//! Postgres store where the transfer protocol depends on it:
//!
//! - writes to an account row take a per-row lock held until the
//!   transaction commits, rolls back or is dropped
//! - uncommitted writes are visible only inside their own transaction
//! - ids come from shared counters, so rolled back inserts leave gaps
//!
//! It also records every balance increment in issue order and can inject
//! one-shot failures at any step, which the orchestrator tests rely on.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::{Account, Currency, Entry, Transfer};

use super::{
    CreateAccountParams, CreateEntryParams, CreateTransferParams, LedgerStore, LedgerTx,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, StoreError, StoreResult,
    UpdateAccountParams,
};

/// A step at which the next matching call fails once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    CreateTransfer,
    CreateEntry { account_id: i64 },
    AddBalance { account_id: i64 },
    /// `add_account_balance` on this account reports a deadlock
    Deadlock { account_id: i64 },
    Commit,
    Rollback,
}

/// One `add_account_balance` call, in the order it was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceStatement {
    pub tx_id: u64,
    pub account_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<RowLock<()>>>>,
    faults: Mutex<Vec<FailPoint>>,
    statements: Mutex<Vec<BalanceStatement>>,
    next_account_id: AtomicI64,
    next_entry_id: AtomicI64,
    next_transfer_id: AtomicI64,
    next_tx_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn take_fault(&self, point: FailPoint) -> bool {
        let mut faults = lock(&self.faults);
        match faults.iter().position(|f| *f == point) {
            Some(pos) => {
                faults.remove(pos);
                true
            }
            None => false,
        }
    }

    fn row_lock(&self, account_id: i64) -> Arc<RowLock<()>> {
        lock(&self.row_locks).entry(account_id).or_default().clone()
    }
}

fn injected(point: FailPoint) -> StoreError {
    StoreError::Backend(format!("injected failure at {:?}", point))
}

/// Ledger store held in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    shared: Arc<Shared>,
    lock_timeout: Option<Duration>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up waiting for a row lock after `timeout` and report a deadlock,
    /// the way Postgres' deadlock detector aborts one side of a cycle.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Arm a one-shot failure
    pub fn inject(&self, point: FailPoint) {
        lock(&self.shared.faults).push(point);
    }

    /// Every balance increment issued so far, across all transactions
    pub fn balance_statements(&self) -> Vec<BalanceStatement> {
        lock(&self.shared.statements).clone()
    }

    /// Committed account row, bypassing transactions
    pub fn committed_account(&self, id: i64) -> Option<Account> {
        lock(&self.shared.tables).accounts.get(&id).cloned()
    }

    pub fn committed_entries(&self) -> Vec<Entry> {
        lock(&self.shared.tables).entries.values().cloned().collect()
    }

    pub fn committed_transfers(&self) -> Vec<Transfer> {
        lock(&self.shared.tables).transfers.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> StoreResult<MemoryLedgerTx> {
        if self.shared.take_fault(FailPoint::Begin) {
            return Err(injected(FailPoint::Begin));
        }

        Ok(MemoryLedgerTx {
            id: self.shared.next_tx_id.fetch_add(1, Ordering::SeqCst) + 1,
            store: self.clone(),
            accounts: BTreeMap::new(),
            deleted: BTreeSet::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
            held: HashMap::new(),
        })
    }
}

/// An open in-memory transaction
///
/// Holds its pending writes and the row locks it has taken. Dropping it
/// discards the writes and releases the locks.
#[derive(Debug)]
pub struct MemoryLedgerTx {
    id: u64,
    store: MemoryLedgerStore,
    /// Rows created or modified by this transaction
    accounts: BTreeMap<i64, Account>,
    deleted: BTreeSet<i64>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    held: HashMap<i64, OwnedMutexGuard<()>>,
}

impl MemoryLedgerTx {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn shared(&self) -> &Shared {
        &self.store.shared
    }

    fn visible_account(&self, id: i64) -> Option<Account> {
        if self.deleted.contains(&id) {
            return None;
        }
        if let Some(account) = self.accounts.get(&id) {
            return Some(account.clone());
        }
        lock(&self.shared().tables).accounts.get(&id).cloned()
    }

    fn visible_accounts(&self) -> BTreeMap<i64, Account> {
        let mut accounts = lock(&self.shared().tables).accounts.clone();
        accounts.extend(self.accounts.iter().map(|(id, a)| (*id, a.clone())));
        accounts.retain(|id, _| !self.deleted.contains(id));
        accounts
    }

    fn require_account(&self, id: i64) -> StoreResult<Account> {
        self.visible_account(id).ok_or(StoreError::NotFound)
    }

    /// Take the row lock for `id` unless this transaction already holds it
    async fn lock_row(&mut self, id: i64) -> StoreResult<()> {
        if self.held.contains_key(&id) {
            return Ok(());
        }

        let row = self.shared().row_lock(id);
        let guard = match self.store.lock_timeout {
            Some(timeout) => tokio::time::timeout(timeout, row.lock_owned())
                .await
                .map_err(|_| {
                    StoreError::Deadlock(format!("lock wait timeout on account {}", id))
                })?,
            None => row.lock_owned().await,
        };

        self.held.insert(id, guard);
        Ok(())
    }

    /// Lock an existing account row and return its current state
    async fn lock_account(&mut self, id: i64) -> StoreResult<Account> {
        self.require_account(id)?;
        self.lock_row(id).await?;
        // re-read: the row may have changed or vanished while we waited
        self.require_account(id)
    }

    fn has_references(&self, account_id: i64) -> bool {
        let touches = |t: &Transfer| t.from_account_id == account_id || t.to_account_id == account_id;

        if self.entries.iter().any(|e| e.account_id == account_id)
            || self.transfers.iter().any(touches)
        {
            return true;
        }

        let tables = lock(&self.shared().tables);
        tables.entries.values().any(|e| e.account_id == account_id)
            || tables.transfers.values().any(touches)
    }

    fn require_foreign_key(&self, table: &str, account_id: i64) -> StoreResult<()> {
        if self.visible_account(account_id).is_none() {
            return Err(StoreError::UniqueViolation(format!(
                "{}: account {} does not exist",
                table, account_id
            )));
        }
        Ok(())
    }

    /// Re-validate this transaction's writes against rows other transactions
    /// committed since they were made. Runs under the `tables` lock at commit.
    fn check_constraints(&self, tables: &Tables) -> StoreResult<()> {
        for account in self.accounts.values() {
            let taken = tables.accounts.values().any(|other| {
                other.id != account.id
                    && !self.deleted.contains(&other.id)
                    && other.owner == account.owner
                    && other.currency == account.currency
            });
            if taken {
                return Err(StoreError::UniqueViolation(format!(
                    "accounts_owner_currency_key: ({}, {}) already exists",
                    account.owner, account.currency
                )));
            }
        }

        let exists = |id: i64| {
            !self.deleted.contains(&id)
                && (self.accounts.contains_key(&id) || tables.accounts.contains_key(&id))
        };
        let referenced = self
            .entries
            .iter()
            .map(|e| ("entries_account_id_fkey", e.account_id))
            .chain(self.transfers.iter().flat_map(|t| {
                [
                    ("transfers_from_account_id_fkey", t.from_account_id),
                    ("transfers_to_account_id_fkey", t.to_account_id),
                ]
            }));
        for (constraint, account_id) in referenced {
            if !exists(account_id) {
                return Err(StoreError::UniqueViolation(format!(
                    "{}: account {} does not exist",
                    constraint, account_id
                )));
            }
        }

        for id in &self.deleted {
            let touches =
                |t: &Transfer| t.from_account_id == *id || t.to_account_id == *id;
            if tables.entries.values().any(|e| e.account_id == *id)
                || tables.transfers.values().any(touches)
            {
                return Err(StoreError::UniqueViolation(format!(
                    "account {} is still referenced by entries or transfers",
                    id
                )));
            }
        }

        Ok(())
    }

    fn visible_entries(&self) -> BTreeMap<i64, Entry> {
        let mut entries = lock(&self.shared().tables).entries.clone();
        entries.extend(self.entries.iter().map(|e| (e.id, e.clone())));
        entries
    }

    fn visible_transfers(&self) -> BTreeMap<i64, Transfer> {
        let mut transfers = lock(&self.shared().tables).transfers.clone();
        transfers.extend(self.transfers.iter().map(|t| (t.id, t.clone())));
        transfers
    }
}

fn paginate<T>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.skip(offset).take(limit).collect()
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn create_account(&mut self, params: &CreateAccountParams) -> StoreResult<Account> {
        let currency = params.currency.as_str();
        let duplicate = self
            .visible_accounts()
            .values()
            .any(|a| a.owner == params.owner && a.currency == currency);
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "accounts_owner_currency_key: ({}, {}) already exists",
                params.owner, currency
            )));
        }

        let account = Account {
            id: self.shared().next_account_id.fetch_add(1, Ordering::SeqCst) + 1,
            owner: params.owner.clone(),
            balance: params.balance,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        self.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> StoreResult<Account> {
        self.require_account(id)
    }

    async fn get_account_with_currency(
        &mut self,
        id: i64,
        currency: Currency,
    ) -> StoreResult<Account> {
        self.visible_account(id)
            .filter(|a| a.currency == currency.as_str())
            .ok_or(StoreError::NotFound)
    }

    async fn update_account(&mut self, params: &UpdateAccountParams) -> StoreResult<Account> {
        let mut account = self.lock_account(params.id).await?;
        account.balance = params.balance;
        self.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn list_accounts(&mut self, params: &ListAccountsParams) -> StoreResult<Vec<Account>> {
        let accounts = self.visible_accounts();
        let rows = accounts
            .into_values()
            .filter(|a| params.owner.as_ref().map_or(true, |owner| &a.owner == owner));

        Ok(paginate(rows, params.limit, params.offset))
    }

    async fn delete_account(&mut self, id: i64) -> StoreResult<()> {
        self.lock_account(id).await?;
        if self.has_references(id) {
            return Err(StoreError::UniqueViolation(format!(
                "account {} is still referenced by entries or transfers",
                id
            )));
        }

        self.accounts.remove(&id);
        self.deleted.insert(id);
        Ok(())
    }

    async fn add_account_balance(&mut self, id: i64, amount: i64) -> StoreResult<Account> {
        lock(&self.shared().statements).push(BalanceStatement {
            tx_id: self.id,
            account_id: id,
        });

        let deadlock = FailPoint::Deadlock { account_id: id };
        if self.shared().take_fault(deadlock) {
            return Err(StoreError::Deadlock(format!("injected deadlock on account {}", id)));
        }
        let failure = FailPoint::AddBalance { account_id: id };
        if self.shared().take_fault(failure) {
            return Err(injected(failure));
        }

        let mut account = self.lock_account(id).await?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::Backend(format!("balance out of range for account {}", id)))?;
        self.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn create_entry(&mut self, params: &CreateEntryParams) -> StoreResult<Entry> {
        let failure = FailPoint::CreateEntry {
            account_id: params.account_id,
        };
        if self.shared().take_fault(failure) {
            return Err(injected(failure));
        }
        self.require_foreign_key("entries_account_id_fkey", params.account_id)?;

        let entry = Entry {
            id: self.shared().next_entry_id.fetch_add(1, Ordering::SeqCst) + 1,
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());

        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry> {
        self.visible_entries().remove(&id).ok_or(StoreError::NotFound)
    }

    async fn list_entries(&mut self, params: &ListEntriesParams) -> StoreResult<Vec<Entry>> {
        let rows = self
            .visible_entries()
            .into_values()
            .filter(|e| e.account_id == params.account_id);

        Ok(paginate(rows, params.limit, params.offset))
    }

    async fn create_transfer(&mut self, params: &CreateTransferParams) -> StoreResult<Transfer> {
        if self.shared().take_fault(FailPoint::CreateTransfer) {
            return Err(injected(FailPoint::CreateTransfer));
        }
        self.require_foreign_key("transfers_from_account_id_fkey", params.from_account_id)?;
        self.require_foreign_key("transfers_to_account_id_fkey", params.to_account_id)?;

        let transfer = Transfer {
            id: self.shared().next_transfer_id.fetch_add(1, Ordering::SeqCst) + 1,
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());

        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer> {
        self.visible_transfers().remove(&id).ok_or(StoreError::NotFound)
    }

    async fn list_transfers(&mut self, params: &ListTransfersParams) -> StoreResult<Vec<Transfer>> {
        let account_id = params.account_id;
        let rows = self
            .visible_transfers()
            .into_values()
            .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id);

        Ok(paginate(rows, params.limit, params.offset))
    }

    async fn commit(self) -> StoreResult<()> {
        if self.shared().take_fault(FailPoint::Commit) {
            return Err(injected(FailPoint::Commit));
        }

        {
            let mut tables = lock(&self.shared().tables);
            self.check_constraints(&tables)?;

            for id in &self.deleted {
                tables.accounts.remove(id);
            }
            tables.accounts.extend(self.accounts.iter().map(|(id, a)| (*id, a.clone())));
            tables.entries.extend(self.entries.iter().map(|e| (e.id, e.clone())));
            tables.transfers.extend(self.transfers.iter().map(|t| (t.id, t.clone())));
        }

        // row locks are released only after the writes are published
        drop(self);
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        if self.shared().take_fault(FailPoint::Rollback) {
            return Err(injected(FailPoint::Rollback));
        }
        Ok(())
    }
}
