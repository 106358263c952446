mod common;

use chrono::Utc;
use uuid::Uuid;

use common::{Trip, count, insert_user, trip};
use engine::{EngineError, MemberRole, SplitInput, TransactionCmd, TransactionKind};

/// Bob pays 300 split three ways; Carol pays 90 for herself and Bob.
async fn seed(t: &Trip) {
    t.engine
        .create_transaction(
            TransactionCmd::new(
                t.group_id,
                t.bob,
                TransactionKind::Credit,
                300,
                "Hotel",
                Utc::now(),
            )
            .split(SplitInput::amount(t.alice, 0))
            .split(SplitInput::amount(t.bob, 0))
            .split(SplitInput::amount(t.carol, 0)),
        )
        .await
        .unwrap();
    t.engine
        .create_transaction(
            TransactionCmd::new(
                t.group_id,
                t.carol,
                TransactionKind::Credit,
                90,
                "Taxi",
                Utc::now(),
            )
            .split(SplitInput::amount(t.bob, 0))
            .split(SplitInput::amount(t.carol, 0)),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn leaving_hands_history_to_a_guest() {
    let t = trip().await;
    seed(&t).await;
    let before = t.engine.member_balances(t.group_id, t.alice).await.unwrap();
    let bob_before = before.iter().find(|b| b.user_id == t.bob).unwrap().clone();

    t.engine.leave_group(t.group_id, t.bob).await.unwrap();

    let group = t.engine.group_detail(t.group_id, t.alice).await.unwrap();
    assert!(group.members.iter().all(|m| m.user_id != t.bob));
    let guest = group
        .members
        .iter()
        .find(|m| m.username == "bob")
        .unwrap();
    assert_eq!(guest.role, MemberRole::Guest);
    assert_ne!(guest.user_id, t.bob);

    let guest_user = t.engine.user_by_id(guest.user_id).await.unwrap();
    assert!(guest_user.is_guest);

    // No row of the group points at Bob any more.
    let gid = t.group_id.to_string();
    let bob = t.bob.to_string();
    for sql in [
        "SELECT COUNT(*) AS n FROM transaction_splits WHERE user_id = ?",
        "SELECT COUNT(*) AS n FROM transactions WHERE payer_id = ?",
        "SELECT COUNT(*) AS n FROM transactions WHERE created_by_id = ?",
        "SELECT COUNT(*) AS n FROM members WHERE user_id = ?",
    ] {
        assert_eq!(count(&t.db, sql, bob.clone()).await, 0, "{sql}");
    }

    let after = t.engine.member_balances(t.group_id, t.alice).await.unwrap();
    let guest_balance = after.iter().find(|b| b.user_id == guest.user_id).unwrap();
    assert_eq!(guest_balance.username, "bob");
    assert_eq!(guest_balance.paid_minor, bob_before.paid_minor);
    assert_eq!(guest_balance.received_minor, bob_before.received_minor);
    assert_eq!(guest_balance.balance_minor, bob_before.balance_minor);
    assert_eq!(after.iter().map(|b| b.balance_minor).sum::<i64>(), 0);

    let total = count(
        &t.db,
        "SELECT SUM(amount_minor) AS n FROM transactions WHERE group_id = ?",
        gid,
    )
    .await;
    assert_eq!(total, 390);

    // The creator snapshot is left as recorded.
    let page = t
        .engine
        .list_transactions_page(t.group_id, t.alice, 10, None)
        .await
        .unwrap();
    let hotel = page.items.iter().find(|tx| tx.description == "Hotel").unwrap();
    assert_eq!(hotel.created_by, "bob");
    assert_eq!(hotel.created_by_id, guest.user_id);

    // Bob lost access entirely.
    let err = t
        .engine
        .group_detail(t.group_id, t.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(t.engine.list_active_groups_for(t.bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_and_outsiders_cannot_leave() {
    let t = trip().await;
    let err = t.engine.leave_group(t.group_id, t.alice).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));

    let mallory = insert_user(&t.db, "mallory").await;
    let err = t.engine.leave_group(t.group_id, mallory).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = t
        .engine
        .leave_group(Uuid::new_v4(), t.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn admins_replace_members_with_guests() {
    let t = trip().await;
    seed(&t).await;

    let err = t
        .engine
        .replace_member_with_guest(t.group_id, t.carol, t.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = t
        .engine
        .replace_member_with_guest(t.group_id, t.alice, t.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));

    let err = t
        .engine
        .replace_member_with_guest(t.group_id, Uuid::new_v4(), t.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let group = t
        .engine
        .replace_member_with_guest(t.group_id, t.carol, t.alice)
        .await
        .unwrap();
    let guest = group
        .members
        .iter()
        .find(|m| m.username == "carol")
        .unwrap();
    assert_eq!(guest.role, MemberRole::Guest);

    // A guest cannot be replaced again.
    let err = t
        .engine
        .replace_member_with_guest(t.group_id, guest.user_id, t.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn departure_leaves_other_groups_untouched() {
    let t = trip().await;
    seed(&t).await;

    let flat = t.engine.create_group(t.bob, "Flat", None).await.unwrap();
    t.engine
        .create_transaction(
            TransactionCmd::new(
                flat.id,
                t.bob,
                TransactionKind::Debit,
                50,
                "Rent share",
                Utc::now(),
            )
            .split(SplitInput::amount(t.bob, 0)),
        )
        .await
        .unwrap();

    t.engine.leave_group(t.group_id, t.bob).await.unwrap();

    let flat = t.engine.group_detail(flat.id, t.bob).await.unwrap();
    assert_eq!(flat.members[0].user_id, t.bob);
    assert_eq!(flat.members[0].role, MemberRole::Owner);

    let n = count(
        &t.db,
        "SELECT COUNT(*) AS n FROM transaction_splits WHERE user_id = ?",
        t.bob.to_string(),
    )
    .await;
    assert_eq!(n, 1);
}
