//! Integration tests for the Postgres ledger store and queries
//!
//! Run with: cargo test --features integration_tests
#![cfg(feature = "integration_tests")]

use ledger_transfer::store::{
    CreateAccountParams, CreateEntryParams, CreateTransferParams, LedgerStore, LedgerTx,
    ListAccountsParams, UpdateAccountParams,
};
use ledger_transfer::{
    AccountHandler, AppError, CreateAccountCommand, Currency, OperationContext, Page,
    PgLedgerStore, QueryService, TransferCommand, TransferHandler,
};

mod common;

#[tokio::test]
async fn test_schema_is_present() {
    let pool = common::setup_test_db().await;

    ledger_transfer::db::verify_connection(&pool).await.unwrap();
    assert!(ledger_transfer::db::check_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_account_crud() {
    let pool = common::setup_test_db().await;
    let store = PgLedgerStore::new(pool.clone());
    let owner = common::unique_owner("crud");

    let mut tx = store.begin().await.unwrap();
    let account = tx
        .create_account(&CreateAccountParams {
            owner: owner.clone(),
            balance: 10,
            currency: Currency::Eur,
        })
        .await
        .unwrap();
    assert_eq!(account.owner, owner);
    assert_eq!(account.currency, "EUR");

    let fetched = tx.get_account(account.id).await.unwrap();
    assert_eq!(fetched, account);

    assert!(tx
        .get_account_with_currency(account.id, Currency::Usd)
        .await
        .unwrap_err()
        .is_not_found());

    let updated = tx
        .update_account(&UpdateAccountParams { id: account.id, balance: 99 })
        .await
        .unwrap();
    assert_eq!(updated.balance, 99);

    let added = tx.add_account_balance(account.id, -9).await.unwrap();
    assert_eq!(added.balance, 90);

    tx.delete_account(account.id).await.unwrap();
    assert!(tx.get_account(account.id).await.unwrap_err().is_not_found());
    assert!(tx.delete_account(account.id).await.unwrap_err().is_not_found());

    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let pool = common::setup_test_db().await;
    let store = PgLedgerStore::new(pool.clone());
    let account = common::create_account(&store, 100).await;

    let mut tx = store.begin().await.unwrap();
    tx.add_account_balance(account.id, 50).await.unwrap();
    tx.create_entry(&CreateEntryParams { account_id: account.id, amount: 50 })
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(common::balance_of(&pool, account.id).await, 100);
    assert_eq!(common::count_entries(&pool, account.id).await, 0);
}

#[tokio::test]
async fn test_constraint_violations() {
    let pool = common::setup_test_db().await;
    let store = PgLedgerStore::new(pool.clone());
    let handler = AccountHandler::new(store.clone());
    let context = OperationContext::new();
    let command = CreateAccountCommand::new(common::unique_owner("dup"), Currency::Usd);

    let account = handler.create_account(command.clone(), &context).await.unwrap();
    assert_eq!(account.balance, 0);
    let err = handler.create_account(command, &context).await.unwrap_err();
    assert!(matches!(err, AppError::UniqueViolation(_)));

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .create_transfer(&CreateTransferParams {
            from_account_id: account.id,
            to_account_id: i64::MAX,
            amount: 5,
        })
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn test_queries_see_committed_transfers() {
    let pool = common::setup_test_db().await;
    let store = PgLedgerStore::new(pool.clone());
    let a = common::create_account(&store, 100).await;
    let b = common::create_account(&store, 100).await;

    let transfers = TransferHandler::new(store.clone());
    let context = OperationContext::new();
    for amount in [1, 2, 3] {
        transfers
            .execute(TransferCommand::new(a.id, b.id, amount), &context)
            .await
            .unwrap();
    }

    let queries = QueryService::new(store);
    let first_page = queries.list_transfers(b.id, Page::new(1, 2).unwrap()).await.unwrap();
    let second_page = queries.list_transfers(b.id, Page::new(2, 2).unwrap()).await.unwrap();
    assert_eq!(first_page.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(second_page.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![3]);

    let entries = queries.list_entries(a.id, Page::new(1, 10).unwrap()).await.unwrap();
    assert_eq!(entries.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![-1, -2, -3]);
    assert_eq!(queries.get_entry(entries[0].id).await.unwrap(), entries[0]);

    let transfer = queries.get_transfer(first_page[0].id).await.unwrap();
    assert_eq!((transfer.from_account_id, transfer.to_account_id), (a.id, b.id));

    assert_eq!(queries.get_account(a.id).await.unwrap().balance, 94);
    assert!(matches!(
        queries.get_account_with_currency(a.id, Currency::Eur).await,
        Err(AppError::NotFound(_))
    ));

    let owner = queries.get_account(b.id).await.unwrap().owner;
    let owned = queries.list_accounts(Some(owner), Page::new(1, 5).unwrap()).await.unwrap();
    assert_eq!(owned.iter().map(|acc| acc.id).collect::<Vec<_>>(), vec![b.id]);

    let mut tx = PgLedgerStore::new(pool).begin().await.unwrap();
    let listed = tx
        .list_accounts(&ListAccountsParams { owner: None, limit: 1, offset: 0 })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}
