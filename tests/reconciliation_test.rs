mod common;

use anyhow::Result;
use common::{
    new_account, new_transaction, session, test_service, test_service_with_invalidator,
    ALICE_TOKEN, BOB_TOKEN, GHOST_TOKEN,
};
use moneta::application::{AppError, StaleView};
use moneta::domain::TransactionKind;
use uuid::Uuid;

#[tokio::test]
async fn test_reversal_nets_expense_and_income() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);

    // Opening 120.00; expense 30.00 and income 10.00 leave the balance at
    // 100.00 going into the deletion.
    let account = service.create_account(&alice, new_account("A", 12000)).await?;
    let t1 = service
        .record_transaction(
            &alice,
            new_transaction(account.id, TransactionKind::Expense, 3000, "2024-01-10"),
        )
        .await?;
    let t2 = service
        .record_transaction(
            &alice,
            new_transaction(account.id, TransactionKind::Income, 1000, "2024-01-11"),
        )
        .await?;

    let before = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(before.account.balance, 100.0);

    // Net delta: +30.00 (reversing the expense) - 10.00 (reversing the
    // income) = +20.00.
    let outcome = service
        .bulk_delete_transactions(&alice, &[t1.id, t2.id])
        .await?;
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.touched_accounts, vec![account.id]);

    let after = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(after.account.balance, 120.0);
    assert_eq!(after.transaction_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_full_reversal_restores_opening_balance() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);

    let account = service.create_account(&alice, new_account("A", 55500)).await?;

    let entries = [
        (TransactionKind::Expense, 1234),
        (TransactionKind::Income, 99),
        (TransactionKind::Expense, 7),
        (TransactionKind::Income, 45000),
        (TransactionKind::Expense, 20000),
    ];
    let mut ids = Vec::new();
    for (kind, amount) in entries {
        let recorded = service
            .record_transaction(
                &alice,
                new_transaction(account.id, kind, amount, "2024-06-01"),
            )
            .await?;
        ids.push(recorded.id);
    }

    let outcome = service.bulk_delete_transactions(&alice, &ids).await?;
    assert_eq!(outcome.deleted, ids.len() as u64);

    let after = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(after.account.balance, 555.0);
    Ok(())
}

#[tokio::test]
async fn test_empty_id_set_is_a_no_op() -> Result<()> {
    let (service, _repo, invalidator, _temp) = test_service_with_invalidator().await?;
    let alice = session(ALICE_TOKEN);

    let account = service.create_account(&alice, new_account("A", 10000)).await?;
    let before_count = invalidator.notified().len();

    let outcome = service.bulk_delete_transactions(&alice, &[]).await?;
    assert_eq!(outcome.deleted, 0);
    assert!(outcome.touched_accounts.is_empty());

    let detail = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(detail.account.balance, 100.0);
    // No stale-view notifications for a no-op.
    assert_eq!(invalidator.notified().len(), before_count);
    Ok(())
}

#[tokio::test]
async fn test_unknown_ids_are_ignored() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);

    let account = service.create_account(&alice, new_account("A", 10000)).await?;

    let outcome = service
        .bulk_delete_transactions(&alice, &[Uuid::new_v4(), Uuid::new_v4()])
        .await?;
    assert_eq!(outcome.deleted, 0);
    assert!(outcome.touched_accounts.is_empty());

    let detail = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(detail.account.balance, 100.0);
    Ok(())
}

#[tokio::test]
async fn test_foreign_transactions_are_excluded() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);
    let bob = session(BOB_TOKEN);

    let alices = service.create_account(&alice, new_account("Alice", 10000)).await?;
    let bobs = service.create_account(&bob, new_account("Bob", 10000)).await?;

    let alice_tx = service
        .record_transaction(
            &alice,
            new_transaction(alices.id, TransactionKind::Expense, 2000, "2024-03-01"),
        )
        .await?;
    let bob_tx = service
        .record_transaction(
            &bob,
            new_transaction(bobs.id, TransactionKind::Expense, 2000, "2024-03-01"),
        )
        .await?;

    // Alice names Bob's transaction too; it is silently excluded from both
    // the deletion and the balance math.
    let outcome = service
        .bulk_delete_transactions(&alice, &[alice_tx.id, bob_tx.id])
        .await?;
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.touched_accounts, vec![alices.id]);

    let alice_detail = service
        .get_account_with_transactions(&alice, alices.id)
        .await?
        .unwrap();
    assert_eq!(alice_detail.account.balance, 100.0);
    assert_eq!(alice_detail.transaction_count, 0);

    let bob_detail = service
        .get_account_with_transactions(&bob, bobs.id)
        .await?
        .unwrap();
    assert_eq!(bob_detail.account.balance, 80.0);
    assert_eq!(bob_detail.transaction_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_many_transactions_net_into_one_account_update() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);

    let account = service.create_account(&alice, new_account("A", 0)).await?;
    let mut ids = Vec::new();
    for i in 1..=10 {
        let recorded = service
            .record_transaction(
                &alice,
                new_transaction(account.id, TransactionKind::Income, i * 100, "2024-05-01"),
            )
            .await?;
        ids.push(recorded.id);
    }

    let outcome = service.bulk_delete_transactions(&alice, &ids).await?;
    assert_eq!(outcome.deleted, 10);
    // All ten deltas were netted against the single touched account.
    assert_eq!(outcome.touched_accounts, vec![account.id]);

    let after = service
        .get_account_with_transactions(&alice, account.id)
        .await?
        .unwrap();
    assert_eq!(after.account.balance, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_deletion_spans_multiple_accounts() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;
    let alice = session(ALICE_TOKEN);

    let a = service.create_account(&alice, new_account("A", 10000)).await?;
    let b = service.create_account(&alice, new_account("B", 20000)).await?;

    let ta = service
        .record_transaction(
            &alice,
            new_transaction(a.id, TransactionKind::Expense, 5000, "2024-04-01"),
        )
        .await?;
    let tb = service
        .record_transaction(
            &alice,
            new_transaction(b.id, TransactionKind::Income, 2500, "2024-04-02"),
        )
        .await?;

    let outcome = service.bulk_delete_transactions(&alice, &[ta.id, tb.id]).await?;
    assert_eq!(outcome.deleted, 2);
    let mut touched = outcome.touched_accounts.clone();
    touched.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(touched, expected);

    let a_after = service.get_account_with_transactions(&alice, a.id).await?.unwrap();
    let b_after = service.get_account_with_transactions(&alice, b.id).await?.unwrap();
    assert_eq!(a_after.account.balance, 100.0);
    assert_eq!(b_after.account.balance, 200.0);
    Ok(())
}

#[tokio::test]
async fn test_deletion_notifies_stale_views() -> Result<()> {
    let (service, _repo, invalidator, _temp) = test_service_with_invalidator().await?;
    let alice = session(ALICE_TOKEN);

    let account = service.create_account(&alice, new_account("A", 10000)).await?;
    let recorded = service
        .record_transaction(
            &alice,
            new_transaction(account.id, TransactionKind::Expense, 1000, "2024-01-01"),
        )
        .await?;

    let before = invalidator.notified().len();
    service.bulk_delete_transactions(&alice, &[recorded.id]).await?;

    let notified = invalidator.notified();
    let new_views = &notified[before..];
    assert!(new_views.contains(&StaleView::Dashboard));
    assert!(new_views.contains(&StaleView::AccountDetail(account.id)));
    Ok(())
}

#[tokio::test]
async fn test_deletion_requires_resolvable_session() -> Result<()> {
    let (service, _repo, _temp) = test_service().await?;

    let result = service
        .bulk_delete_transactions(&session("session-nobody"), &[Uuid::new_v4()])
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    let result = service
        .bulk_delete_transactions(&session(GHOST_TOKEN), &[Uuid::new_v4()])
        .await;
    assert!(matches!(result, Err(AppError::UserNotFound)));
    Ok(())
}
