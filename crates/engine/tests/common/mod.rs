#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{Engine, MemberRole};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Inserts a user without a password; email is `{username}@example.com`.
pub async fn insert_user(db: &DatabaseConnection, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, username, email, created_at) VALUES (?, ?, ?, ?)",
        vec![
            id.to_string().into(),
            username.into(),
            format!("{username}@example.com").into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();
    id
}

/// Invites `user` by email and accepts on their behalf.
pub async fn join(engine: &Engine, group_id: Uuid, inviter: Uuid, user: Uuid, username: &str, role: MemberRole) {
    let outcome = engine
        .add_member(group_id, inviter, &format!("{username}@example.com"), role)
        .await
        .unwrap();
    let invitation = outcome.invitation.unwrap();
    engine
        .respond_to_invitation(invitation.id, user, true)
        .await
        .unwrap();
}

pub struct Trip {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub group_id: Uuid,
    pub alice: Uuid,
    pub bob: Uuid,
    pub carol: Uuid,
}

/// Alice owns "Trip"; Bob is an EDITOR and Carol a CONTRIBUTOR.
pub async fn trip() -> Trip {
    let (engine, db) = engine_with_db().await;
    let alice = insert_user(&db, "alice").await;
    let bob = insert_user(&db, "bob").await;
    let carol = insert_user(&db, "carol").await;
    let group = engine.create_group(alice, "Trip", None).await.unwrap();
    join(&engine, group.id, alice, bob, "bob", MemberRole::Editor).await;
    join(&engine, group.id, alice, carol, "carol", MemberRole::Contributor).await;
    Trip {
        engine,
        db,
        group_id: group.id,
        alice,
        bob,
        carol,
    }
}

pub async fn count(db: &DatabaseConnection, sql: &str, value: String) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(backend, sql, vec![value.into()]))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}
