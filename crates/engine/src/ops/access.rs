use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Group, Member, MemberRole, ResultEngine, groups, members, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn find_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<Member>> {
        members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(db)
            .await?
            .map(Member::try_from)
            .transpose()
    }

    pub(super) async fn find_active_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<Member>> {
        Ok(self
            .find_member(db, group_id, user_id)
            .await?
            .filter(|m| m.is_active))
    }

    /// Gate shared by every group-scoped operation.
    ///
    /// A missing group is `KeyNotFound`; a caller without an active membership
    /// or with a role below `threshold` is `Forbidden`.
    pub(super) async fn require_role(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
        threshold: MemberRole,
    ) -> ResultEngine<(groups::Model, Member)> {
        let group = self.require_group(db, group_id).await?;
        let Some(member) = self.find_active_member(db, group_id, user_id).await? else {
            return Err(EngineError::Forbidden(
                "not a member of this group".to_string(),
            ));
        };
        if !member.role.at_least(threshold) {
            return Err(EngineError::Forbidden(format!(
                "role {} or higher required",
                threshold.as_str()
            )));
        }
        Ok((group, member))
    }

    /// Read access: any membership row, active or not.
    pub(super) async fn require_any_membership(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        let group = self.require_group(db, group_id).await?;
        if self.find_member(db, group_id, user_id).await?.is_none() {
            return Err(EngineError::Forbidden(
                "not a member of this group".to_string(),
            ));
        }
        Ok(group)
    }

    /// Active members of a group, owner first then by join time.
    pub(super) async fn active_members(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Member>> {
        let rows = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id.to_string()))
            .filter(members::Column::IsActive.eq(true))
            .all(db)
            .await?;
        let mut out = rows
            .into_iter()
            .map(Member::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        out.sort_by_key(|m| (m.role != MemberRole::Owner, m.joined_at));
        Ok(out)
    }

    pub(super) async fn group_with_members(
        &self,
        db: &DatabaseTransaction,
        model: groups::Model,
    ) -> ResultEngine<Group> {
        let mut group = Group::try_from(model)?;
        group.members = self.active_members(db, group.id).await?;
        Ok(group)
    }
}
