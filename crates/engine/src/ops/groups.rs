use std::collections::HashMap;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{EngineError, Group, Member, MemberRole, ResultEngine, groups, members};

use super::{Engine, is_unique_violation, normalize_optional_text, normalize_required_name, with_tx};

impl Engine {
    /// Groups where `user_id` is an active member, each with its active
    /// members.
    pub async fn list_active_groups_for(&self, user_id: Uuid) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let group_ids: Vec<String> = members::Entity::find()
                .filter(members::Column::UserId.eq(user_id.to_string()))
                .filter(members::Column::IsActive.eq(true))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();
            if group_ids.is_empty() {
                return Ok(Vec::new());
            }

            let group_models = groups::Entity::find()
                .filter(groups::Column::Id.is_in(group_ids.clone()))
                .order_by_asc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let member_models = members::Entity::find()
                .filter(members::Column::GroupId.is_in(group_ids))
                .filter(members::Column::IsActive.eq(true))
                .all(&db_tx)
                .await?;

            let mut by_group: HashMap<Uuid, Vec<Member>> = HashMap::new();
            for model in member_models {
                let member = Member::try_from(model)?;
                by_group.entry(member.group_id).or_default().push(member);
            }

            let mut out = Vec::with_capacity(group_models.len());
            for model in group_models {
                let mut group = Group::try_from(model)?;
                let mut members = by_group.remove(&group.id).unwrap_or_default();
                members.sort_by_key(|m| (m.role != MemberRole::Owner, m.joined_at));
                group.members = members;
                out.push(group);
            }
            Ok(out)
        })
    }

    /// Creates a group and makes `user_id` its owner.
    ///
    /// Names are unique per creator, case-insensitively.
    pub async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ResultEngine<Group> {
        let name = normalize_required_name(name, "group name")?;
        let description = normalize_optional_text(description);

        let group = with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.ensure_group_name_free(&db_tx, user_id, &name, None)
                .await?;

            let group = Group::new(name.clone(), description.clone(), user_id);
            let model: groups::ActiveModel = (&group).into();
            let model = model.insert(&db_tx).await.map_err(|err| {
                if is_unique_violation(&err) {
                    EngineError::ExistingKey(name.clone())
                } else {
                    err.into()
                }
            })?;
            self.add_owner_membership(&db_tx, group.id, user_id, &user.username)
                .await?;
            self.group_with_members(&db_tx, model).await
        })?;
        tracing::info!(group_id = %group.id, owner = %user_id, "group created");
        Ok(group)
    }

    /// Group detail. Readable by anyone holding a membership row.
    pub async fn group_detail(&self, group_id: Uuid, user_id: Uuid) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_any_membership(&db_tx, group_id, user_id)
                .await?;
            self.group_with_members(&db_tx, model).await
        })
    }

    /// Renames a group or changes its description (owner only).
    ///
    /// `description: Some("")` clears it; `None` leaves it untouched.
    pub async fn update_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ResultEngine<Group> {
        let name = name
            .map(|n| normalize_required_name(n, "group name"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let (model, _) = self
                .require_role(&db_tx, group_id, user_id, MemberRole::Owner)
                .await?;

            let creator = model.created_by.clone();
            let mut active: groups::ActiveModel = model.into();
            if let Some(name) = name {
                let creator = crate::util::parse_uuid(&creator, "user")?;
                self.ensure_group_name_free(&db_tx, creator, &name, Some(group_id))
                    .await?;
                active.name_key = ActiveValue::Set(groups::name_key(&name));
                active.name = ActiveValue::Set(name);
            }
            if let Some(description) = description {
                active.description = ActiveValue::Set(normalize_optional_text(Some(description)));
            }
            let model = active.update(&db_tx).await?;
            self.group_with_members(&db_tx, model).await
        })
    }

    /// Deletes a group and everything it owns (owner only).
    pub async fn delete_group(&self, group_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, group_id, user_id, MemberRole::Owner)
                .await?;
            let group_db_id = group_id.to_string();
            let backend = self.database.get_database_backend();

            // Children first; the schema cascades too, but SQLite only honours
            // it with foreign keys enabled on the connection.
            for sql in [
                "DELETE FROM transaction_splits WHERE transaction_id IN (SELECT id FROM transactions WHERE group_id = ?);",
                "DELETE FROM transactions WHERE group_id = ?;",
                "DELETE FROM invitations WHERE group_id = ?;",
                "DELETE FROM members WHERE group_id = ?;",
                "DELETE FROM \"groups\" WHERE id = ?;",
            ] {
                db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        sql,
                        vec![group_db_id.clone().into()],
                    ))
                    .await?;
            }

            tracing::info!(group_id = %group_id, "group deleted");
            Ok(())
        })
    }

    async fn ensure_group_name_free(
        &self,
        db: &DatabaseTransaction,
        creator: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = groups::Entity::find()
            .filter(groups::Column::CreatedBy.eq(creator.to_string()))
            .filter(groups::Column::NameKey.eq(groups::name_key(name)));
        if let Some(except) = except {
            query = query.filter(groups::Column::Id.ne(except.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
