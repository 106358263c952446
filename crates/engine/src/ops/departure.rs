//! Departure of a member: the person loses every link to the group while the
//! group's history keeps its numbers.
//!
//! A fresh guest user takes over the member's splits, payments, authored
//! transactions and membership row (with the same display name and join
//! time). The creator display-name snapshot on past transactions stays as it
//! was recorded.

use sea_orm::{DatabaseTransaction, Statement, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Group, Member, MemberRole, ResultEngine, User, members};

use super::{Engine, with_tx};

impl Engine {
    /// The caller leaves the group. Owners cannot leave.
    pub async fn leave_group(&self, group_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let Some(member) = self.find_active_member(&db_tx, group_id, user_id).await? else {
                return Err(EngineError::Forbidden(
                    "not a member of this group".to_string(),
                ));
            };
            if member.role == MemberRole::Owner {
                return Err(EngineError::InvalidOperation(
                    "the owner cannot leave the group".to_string(),
                ));
            }
            self.anonymize_member(&db_tx, &member).await?;
            Ok(())
        })
    }

    /// Removes `target_id` and replaces it with a guest (admin or owner).
    pub async fn replace_member_with_guest(
        &self,
        group_id: Uuid,
        target_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let (group, _) = self
                .require_role(&db_tx, group_id, actor_id, MemberRole::Admin)
                .await?;
            if actor_id == target_id {
                return Err(EngineError::InvalidOperation(
                    "cannot replace yourself; leave the group instead".to_string(),
                ));
            }
            let Some(target) = self.find_active_member(&db_tx, group_id, target_id).await? else {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            };
            match target.role {
                MemberRole::Owner => {
                    return Err(EngineError::InvalidOperation(
                        "the owner cannot be replaced".to_string(),
                    ));
                }
                MemberRole::Guest => {
                    return Err(EngineError::InvalidOperation(
                        "member is already a guest".to_string(),
                    ));
                }
                _ => {}
            }
            self.anonymize_member(&db_tx, &target).await?;
            self.group_with_members(&db_tx, group).await
        })
    }

    async fn anonymize_member(&self, db: &DatabaseTransaction, member: &Member) -> ResultEngine<User> {
        let guest = self
            .create_guest_user(db, &member.username, member.group_id)
            .await?;
        let backend = self.database.get_database_backend();
        let guest_id = guest.id.to_string();
        let user_id = member.user_id.to_string();
        let group_id = member.group_id.to_string();

        for sql in [
            "UPDATE transaction_splits SET user_id = ? WHERE user_id = ? \
             AND transaction_id IN (SELECT id FROM transactions WHERE group_id = ?);",
            "UPDATE transactions SET payer_id = ? WHERE payer_id = ? AND group_id = ?;",
            "UPDATE transactions SET created_by_id = ? WHERE created_by_id = ? AND group_id = ?;",
        ] {
            db.execute(Statement::from_sql_and_values(
                backend,
                sql,
                vec![
                    guest_id.clone().into(),
                    user_id.clone().into(),
                    group_id.clone().into(),
                ],
            ))
            .await?;
        }

        members::Entity::delete_by_id((group_id.clone(), user_id.clone()))
            .exec(db)
            .await?;
        let replacement = Member {
            user_id: guest.id,
            group_id: member.group_id,
            username: member.username.clone(),
            role: MemberRole::Guest,
            joined_at: member.joined_at,
            is_active: true,
        };
        self.insert_member(db, &replacement).await?;

        tracing::info!(
            group_id = %member.group_id,
            user_id = %member.user_id,
            guest_id = %guest.id,
            "member replaced by guest"
        );
        Ok(guest)
    }
}
