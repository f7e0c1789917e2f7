//! Lock-ordered balance updates
//!
//! Two transfers over the same pair of accounts in opposite directions
//! would otherwise lock the two rows in opposite order and deadlock. Every
//! transfer instead increments the lower account id first, whatever its
//! role, so row locks on a shared pair are always requested in one order.

use crate::domain::{Account, Amount};
use crate::store::{LedgerTx, StoreResult};

/// Signed change to one account's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account_id: i64,
    pub amount: i64,
}

impl BalanceDelta {
    pub fn debit(account_id: i64, amount: Amount) -> Self {
        Self {
            account_id,
            amount: amount.debit(),
        }
    }

    pub fn credit(account_id: i64, amount: Amount) -> Self {
        Self {
            account_id,
            amount: amount.credit(),
        }
    }
}

/// Apply both deltas inside `tx`, lower account id first.
///
/// Returns the updated `(from, to)` snapshots in logical order. The first
/// failing increment aborts; the second statement is then never issued.
pub async fn add_money<T: LedgerTx>(
    tx: &mut T,
    from: BalanceDelta,
    to: BalanceDelta,
) -> StoreResult<(Account, Account)> {
    if from.account_id < to.account_id {
        let from_account = tx.add_account_balance(from.account_id, from.amount).await?;
        let to_account = tx.add_account_balance(to.account_id, to.amount).await?;
        Ok((from_account, to_account))
    } else {
        let to_account = tx.add_account_balance(to.account_id, to.amount).await?;
        let from_account = tx.add_account_balance(from.account_id, from.amount).await?;
        Ok((from_account, to_account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use crate::store::{
        CreateAccountParams, FailPoint, LedgerStore, MemoryLedgerStore, StoreError,
    };

    async fn seed_pair(store: &MemoryLedgerStore) -> (Account, Account) {
        let mut tx = store.begin().await.unwrap();
        let create = |owner: &str, balance: i64| CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: Currency::Usd,
        };
        let low = tx.create_account(&create("alice", 100)).await.unwrap();
        let high = tx.create_account(&create("bob", 50)).await.unwrap();
        tx.commit().await.unwrap();
        (low, high)
    }

    fn issued_accounts(store: &MemoryLedgerStore) -> Vec<i64> {
        store.balance_statements().iter().map(|s| s.account_id).collect()
    }

    #[tokio::test]
    async fn test_low_to_high_updates_source_first() {
        let store = MemoryLedgerStore::new();
        let (low, high) = seed_pair(&store).await;
        let amount = Amount::new(30).unwrap();

        let mut tx = store.begin().await.unwrap();
        let (from, to) = add_money(
            &mut tx,
            BalanceDelta::debit(low.id, amount),
            BalanceDelta::credit(high.id, amount),
        )
        .await
        .unwrap();

        assert_eq!((from.id, from.balance), (low.id, 70));
        assert_eq!((to.id, to.balance), (high.id, 80));
        assert_eq!(issued_accounts(&store), vec![low.id, high.id]);
    }

    #[tokio::test]
    async fn test_high_to_low_updates_destination_first() {
        let store = MemoryLedgerStore::new();
        let (low, high) = seed_pair(&store).await;
        let amount = Amount::new(20).unwrap();

        let mut tx = store.begin().await.unwrap();
        let (from, to) = add_money(
            &mut tx,
            BalanceDelta::debit(high.id, amount),
            BalanceDelta::credit(low.id, amount),
        )
        .await
        .unwrap();

        // results come back in logical order even though `to` was touched first
        assert_eq!((from.id, from.balance), (high.id, 30));
        assert_eq!((to.id, to.balance), (low.id, 120));
        assert_eq!(issued_accounts(&store), vec![low.id, high.id]);
    }

    #[tokio::test]
    async fn test_first_failure_skips_second_statement() {
        let store = MemoryLedgerStore::new();
        let (low, high) = seed_pair(&store).await;
        let amount = Amount::new(10).unwrap();
        store.inject(FailPoint::AddBalance { account_id: low.id });

        let mut tx = store.begin().await.unwrap();
        let err = add_money(
            &mut tx,
            BalanceDelta::debit(high.id, amount),
            BalanceDelta::credit(low.id, amount),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(issued_accounts(&store), vec![low.id]);
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let store = MemoryLedgerStore::new();
        let (low, _) = seed_pair(&store).await;
        let amount = Amount::new(10).unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = add_money(
            &mut tx,
            BalanceDelta::debit(low.id, amount),
            BalanceDelta::credit(999, amount),
        )
        .await
        .unwrap_err();

        assert!(err.is_not_found());
    }
}
