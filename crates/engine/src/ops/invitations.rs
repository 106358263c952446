use chrono::Utc;
use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Invitation, InvitationStatus, Member, MemberRole, ResultEngine, invitations,
    members, util::normalize_email,
};

use super::{Engine, with_tx};

impl Engine {
    /// Invites `email` into a group with `role` (admin or owner).
    pub async fn create_invitation(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        email: &str,
        role: MemberRole,
    ) -> ResultEngine<Invitation> {
        let email = normalize_email(email)?;
        if !role.is_assignable() {
            return Err(EngineError::InvalidOperation(format!(
                "cannot invite with role {}",
                role.as_str()
            )));
        }

        let invitation = with_tx!(self, |db_tx| {
            let (group, inviter) = self
                .require_role(&db_tx, group_id, actor_id, MemberRole::Admin)
                .await?;

            let pending = invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .filter(invitations::Column::InviteeEmail.eq(email.clone()))
                .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                .one(&db_tx)
                .await?;
            if pending.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "pending invitation for {email}"
                )));
            }

            let invitee = self.find_user_by_email(&db_tx, &email).await?;
            let invitee_id = invitee
                .map(|u| crate::util::parse_uuid(&u.id, "user"))
                .transpose()?;
            if let Some(invitee_id) = invitee_id
                && self
                    .find_active_member(&db_tx, group_id, invitee_id)
                    .await?
                    .is_some()
            {
                return Err(EngineError::ExistingKey(format!(
                    "{email} is already a member"
                )));
            }

            let invitation = Invitation {
                id: Uuid::new_v4(),
                group_id,
                group_name: group.name,
                inviter_id: actor_id,
                inviter_name: inviter.username,
                invitee_id,
                invitee_email: email.clone(),
                role,
                status: InvitationStatus::Pending,
                created_at: Utc::now(),
                responded_at: None,
            };
            let model: invitations::ActiveModel = (&invitation).into();
            model.insert(&db_tx).await?;
            Ok(invitation)
        })?;
        tracing::info!(invitation_id = %invitation.id, group_id = %group_id, "invitation created");
        Ok(invitation)
    }

    /// Accepts or rejects an invitation addressed to `user_id`.
    ///
    /// The invitee is matched by id or, when the account did not exist at
    /// invitation time, by email. Resolved invitations are immutable.
    pub async fn respond_to_invitation(
        &self,
        invitation_id: Uuid,
        user_id: Uuid,
        accept: bool,
    ) -> ResultEngine<Invitation> {
        with_tx!(self, |db_tx| {
            let model = invitations::Entity::find_by_id(invitation_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))?;
            let mut invitation = Invitation::try_from(model)?;
            let user = self.require_user(&db_tx, user_id).await?;

            let addressed = invitation.invitee_id == Some(user_id)
                || invitation.invitee_email == user.email.to_lowercase();
            if !addressed {
                return Err(EngineError::Forbidden(
                    "invitation is addressed to someone else".to_string(),
                ));
            }
            if invitation.status != InvitationStatus::Pending {
                return Err(EngineError::InvalidOperation(format!(
                    "invitation already {}",
                    invitation.status.as_str().to_lowercase()
                )));
            }

            if accept {
                match self
                    .find_member(&db_tx, invitation.group_id, user_id)
                    .await?
                {
                    Some(existing) if existing.is_active => {
                        tracing::debug!(
                            invitation_id = %invitation.id,
                            "invitee already active, not adding a second membership"
                        );
                    }
                    Some(existing) => {
                        let mut active: members::ActiveModel = (&existing).into();
                        active.role = ActiveValue::Set(invitation.role.as_str().to_string());
                        active.is_active = ActiveValue::Set(true);
                        active.update(&db_tx).await?;
                    }
                    None => {
                        let member = Member::new(
                            invitation.group_id,
                            user_id,
                            user.username.clone(),
                            invitation.role,
                        );
                        self.insert_member(&db_tx, &member).await?;
                    }
                }
                invitation.invitee_id = Some(user_id);
                invitation.status = InvitationStatus::Accepted;
            } else {
                invitation.status = InvitationStatus::Rejected;
            }
            invitation.responded_at = Some(Utc::now());

            let active: invitations::ActiveModel = (&invitation).into();
            active.update(&db_tx).await?;
            tracing::info!(
                invitation_id = %invitation.id,
                status = invitation.status.as_str(),
                "invitation resolved"
            );
            Ok(invitation)
        })
    }

    /// Pending invitations addressed to `user_id`, by id or by email.
    pub async fn list_my_pending_invitations(&self, user_id: Uuid) -> ResultEngine<Vec<Invitation>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            invitations::Entity::find()
                .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                .filter(
                    Condition::any()
                        .add(invitations::Column::InviteeId.eq(user_id.to_string()))
                        .add(invitations::Column::InviteeEmail.eq(user.email.to_lowercase())),
                )
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Invitation::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Pending invitations of a group, visible to its members.
    pub async fn list_group_pending_invitations(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Vec<Invitation>> {
        with_tx!(self, |db_tx| {
            self.require_any_membership(&db_tx, group_id, user_id)
                .await?;
            invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Invitation::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
