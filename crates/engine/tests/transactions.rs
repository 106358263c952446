mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{count, insert_user, trip};
use engine::{EngineError, SplitInput, SplitMode, TransactionCmd, TransactionKind};

fn dinner(group_id: Uuid, user_id: Uuid, amount: i64) -> TransactionCmd {
    TransactionCmd::new(
        group_id,
        user_id,
        TransactionKind::Credit,
        amount,
        "Dinner",
        Utc::now(),
    )
}

#[tokio::test]
async fn equal_split_is_accepted_and_amount_mismatch_rejected() {
    let t = trip().await;

    let tx = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.alice, 300)
                .split_mode(SplitMode::Equal)
                .split(SplitInput::amount(t.bob, 150))
                .split(SplitInput::amount(t.carol, 150)),
        )
        .await
        .unwrap();
    assert_eq!(tx.splits.len(), 2);
    assert_eq!(tx.splits.iter().map(|s| s.amount_minor).sum::<i64>(), 300);
    assert_eq!(tx.created_by, "alice");

    let err = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.alice, 300)
                .split_mode(SplitMode::Amount)
                .split(SplitInput::amount(t.bob, 100))
                .split(SplitInput::amount(t.carol, 100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));

    // The rejected write left nothing behind.
    let n = count(
        &t.db,
        "SELECT COUNT(*) AS n FROM transactions WHERE group_id = ?",
        t.group_id.to_string(),
    )
    .await;
    assert_eq!(n, 1);
}

#[tokio::test]
async fn percentage_split_needs_one_hundred() {
    let t = trip().await;

    let err = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.alice, 1000)
                .split_mode(SplitMode::Percentage)
                .split(SplitInput::percentage(t.alice, 50.0))
                .split(SplitInput::percentage(t.bob, 49.0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));

    let tx = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.alice, 1001)
                .split_mode(SplitMode::Percentage)
                .split(SplitInput::percentage(t.alice, 33.33))
                .split(SplitInput::percentage(t.bob, 33.33))
                .split(SplitInput::percentage(t.carol, 33.34)),
        )
        .await
        .unwrap();
    assert_eq!(tx.splits.iter().map(|s| s.amount_minor).sum::<i64>(), 1001);

    let stored = t
        .engine
        .transaction_detail(t.group_id, tx.id, t.carol)
        .await
        .unwrap();
    assert_eq!(stored.splits, tx.splits);
}

#[tokio::test]
async fn role_gates_for_create_update_delete() {
    let t = trip().await;
    let dave = insert_user(&t.db, "dave").await;
    common::join(&t.engine, t.group_id, t.alice, dave, "dave", engine::MemberRole::Viewer).await;

    let err = t
        .engine
        .create_transaction(dinner(t.group_id, dave, 100).split(SplitInput::amount(dave, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // Contributors may create but not modify.
    let tx = t
        .engine
        .create_transaction(dinner(t.group_id, t.carol, 100).split(SplitInput::amount(t.carol, 0)))
        .await
        .unwrap();
    let err = t
        .engine
        .update_transaction(
            tx.id,
            dinner(t.group_id, t.carol, 200).split(SplitInput::amount(t.carol, 0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = t
        .engine
        .delete_transaction(t.group_id, tx.id, t.carol)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    t.engine
        .delete_transaction(t.group_id, tx.id, t.bob)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_replaces_splits_and_keeps_creator() {
    let t = trip().await;
    let tx = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.carol, 300)
                .split(SplitInput::amount(t.alice, 0))
                .split(SplitInput::amount(t.bob, 0))
                .split(SplitInput::amount(t.carol, 0)),
        )
        .await
        .unwrap();

    let updated = t
        .engine
        .update_transaction(
            tx.id,
            TransactionCmd::new(
                t.group_id,
                t.bob,
                TransactionKind::Debit,
                500,
                "Groceries",
                Utc::now(),
            )
            .payer(t.bob)
            .split_mode(SplitMode::Amount)
            .split(SplitInput::amount(t.alice, 200))
            .split(SplitInput::amount(t.bob, 300)),
        )
        .await
        .unwrap();
    assert_eq!(updated.id, tx.id);
    assert_eq!(updated.created_by_id, t.carol);
    assert_eq!(updated.payer_id, Some(t.bob));
    assert_eq!(updated.kind, TransactionKind::Debit);

    let n = count(
        &t.db,
        "SELECT COUNT(*) AS n FROM transaction_splits WHERE transaction_id = ?",
        tx.id.to_string(),
    )
    .await;
    assert_eq!(n, 2);

    // Splits are re-validated against the new amount.
    let err = t
        .engine
        .update_transaction(
            tx.id,
            dinner(t.group_id, t.bob, 999)
                .split_mode(SplitMode::Amount)
                .split(SplitInput::amount(t.alice, 200))
                .split(SplitInput::amount(t.bob, 300)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));
}

#[tokio::test]
async fn participants_must_be_active_members() {
    let t = trip().await;
    let stranger = insert_user(&t.db, "mallory").await;

    let err = t
        .engine
        .create_transaction(dinner(t.group_id, t.alice, 100).split(SplitInput::amount(stranger, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));

    let err = t
        .engine
        .create_transaction(
            dinner(t.group_id, t.alice, 100)
                .payer(stranger)
                .split(SplitInput::amount(t.alice, 0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));
}

#[tokio::test]
async fn transactions_are_scoped_to_their_group() {
    let t = trip().await;
    let other = t.engine.create_group(t.alice, "Flat", None).await.unwrap();
    let tx = t
        .engine
        .create_transaction(dinner(t.group_id, t.alice, 100).split(SplitInput::amount(t.alice, 0)))
        .await
        .unwrap();

    let err = t
        .engine
        .delete_transaction(other.id, tx.id, t.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = t
        .engine
        .delete_transaction(t.group_id, Uuid::new_v4(), t.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn list_pages_newest_first() {
    let t = trip().await;
    let base = Utc::now();
    for i in 0..5 {
        let cmd = TransactionCmd::new(
            t.group_id,
            t.alice,
            TransactionKind::Credit,
            100 + i,
            format!("tx {i}"),
            base - Duration::days(i),
        )
        .split(SplitInput::amount(t.alice, 0));
        t.engine.create_transaction(cmd).await.unwrap();
    }

    let first = t
        .engine
        .list_transactions_page(t.group_id, t.bob, 2, None)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].description, "tx 0");
    assert_eq!(first.items[1].description, "tx 1");
    let cursor = first.next_cursor.unwrap();

    let second = t
        .engine
        .list_transactions_page(t.group_id, t.bob, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second.items[0].description, "tx 2");

    let last = t
        .engine
        .list_transactions_page(t.group_id, t.bob, 2, second.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(last.next_cursor.is_none());

    let err = t
        .engine
        .list_transactions_page(t.group_id, t.bob, 2, Some("not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn balances_follow_payer_and_shares() {
    let t = trip().await;
    t.engine
        .create_transaction(
            dinner(t.group_id, t.alice, 300)
                .split(SplitInput::amount(t.alice, 0))
                .split(SplitInput::amount(t.bob, 0))
                .split(SplitInput::amount(t.carol, 0)),
        )
        .await
        .unwrap();

    let balances = t.engine.member_balances(t.group_id, t.carol).await.unwrap();
    let of = |id: Uuid| balances.iter().find(|b| b.user_id == id).unwrap();
    assert_eq!(of(t.alice).paid_minor, 300);
    assert_eq!(of(t.alice).balance_minor, 200);
    assert_eq!(of(t.bob).balance_minor, -100);
    assert_eq!(of(t.carol).balance_minor, -100);
    assert_eq!(balances.iter().map(|b| b.balance_minor).sum::<i64>(), 0);
}
