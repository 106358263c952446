use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Group, Invitation, Member, MemberRole, ResultEngine, members};

use super::{Engine, normalize_required_name, with_tx};

/// Result of [`Engine::add_member`]: guests join immediately, everyone else
/// gets a pending invitation.
#[derive(Clone, Debug, PartialEq)]
pub struct AddMemberOutcome {
    pub group: Group,
    pub invitation: Option<Invitation>,
}

impl Engine {
    /// Adds someone to a group (admin or owner).
    ///
    /// With `role == Guest`, `identifier` is a display name and a synthetic
    /// guest joins at once. Otherwise `identifier` is an email and an
    /// invitation is created.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        identifier: &str,
        role: MemberRole,
    ) -> ResultEngine<AddMemberOutcome> {
        if role == MemberRole::Guest {
            let group = self.add_guest_member(group_id, actor_id, identifier).await?;
            return Ok(AddMemberOutcome {
                group,
                invitation: None,
            });
        }

        let invitation = self
            .create_invitation(group_id, actor_id, identifier, role)
            .await?;
        let group = self.group_detail(group_id, actor_id).await?;
        Ok(AddMemberOutcome {
            group,
            invitation: Some(invitation),
        })
    }

    /// Adds a synthetic guest named `display_name` (admin or owner).
    pub async fn add_guest_member(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        display_name: &str,
    ) -> ResultEngine<Group> {
        let display_name = normalize_required_name(display_name, "guest name")?;
        with_tx!(self, |db_tx| {
            let (group, _) = self
                .require_role(&db_tx, group_id, actor_id, MemberRole::Admin)
                .await?;
            let taken = self
                .active_members(&db_tx, group_id)
                .await?
                .iter()
                .any(|m| m.username.to_lowercase() == display_name.to_lowercase());
            if taken {
                return Err(EngineError::ExistingKey(display_name));
            }

            let guest = self
                .create_guest_user(&db_tx, &display_name, group_id)
                .await?;
            let member = Member::new(group_id, guest.id, display_name.clone(), MemberRole::Guest);
            self.insert_member(&db_tx, &member).await?;
            tracing::info!(group_id = %group_id, guest_id = %guest.id, "guest added");
            self.group_with_members(&db_tx, group).await
        })
    }

    /// Changes the role of an active member (admin or owner).
    ///
    /// Owners and guests keep their roles, nobody edits their own role, and
    /// neither OWNER nor GUEST can be handed out.
    pub async fn set_role(
        &self,
        group_id: Uuid,
        target_id: Uuid,
        new_role: MemberRole,
        actor_id: Uuid,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let (group, _) = self
                .require_role(&db_tx, group_id, actor_id, MemberRole::Admin)
                .await?;
            if actor_id == target_id {
                return Err(EngineError::InvalidOperation(
                    "cannot change your own role".to_string(),
                ));
            }
            if !new_role.is_assignable() {
                return Err(EngineError::InvalidOperation(format!(
                    "role {} cannot be assigned",
                    new_role.as_str()
                )));
            }
            let Some(target) = self.find_active_member(&db_tx, group_id, target_id).await? else {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            };
            match target.role {
                MemberRole::Owner => {
                    return Err(EngineError::InvalidOperation(
                        "the owner role cannot be changed".to_string(),
                    ));
                }
                MemberRole::Guest => {
                    return Err(EngineError::InvalidOperation(
                        "guest roles cannot be changed".to_string(),
                    ));
                }
                _ => {}
            }

            let mut active: members::ActiveModel = (&target).into();
            active.role = ActiveValue::Set(new_role.as_str().to_string());
            active.update(&db_tx).await?;
            self.group_with_members(&db_tx, group).await
        })
    }

    pub(super) async fn add_owner_membership(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
        username: &str,
    ) -> ResultEngine<()> {
        let member = Member::new(group_id, user_id, username.to_string(), MemberRole::Owner);
        self.insert_member(db, &member).await
    }

    /// Inserts a membership row; a row for the same `(group, user)` is a
    /// conflict.
    pub(super) async fn insert_member(
        &self,
        db: &DatabaseTransaction,
        member: &Member,
    ) -> ResultEngine<()> {
        if self
            .find_member(db, member.group_id, member.user_id)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(member.username.clone()));
        }
        let model: members::ActiveModel = member.into();
        model.insert(db).await?;
        Ok(())
    }
}
