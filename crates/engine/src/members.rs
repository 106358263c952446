//! Group membership rows and the role hierarchy.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// Member role, ordered from most to least privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    Editor,
    Contributor,
    Viewer,
    Guest,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Editor => "EDITOR",
            Self::Contributor => "CONTRIBUTOR",
            Self::Viewer => "VIEWER",
            Self::Guest => "GUEST",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Owner => 5,
            Self::Admin => 4,
            Self::Editor => 3,
            Self::Contributor => 2,
            Self::Viewer => 1,
            Self::Guest => 0,
        }
    }

    /// Returns `true` when `self` grants at least the privileges of
    /// `threshold`.
    pub fn at_least(self, threshold: MemberRole) -> bool {
        self.rank() >= threshold.rank()
    }

    /// Roles an admin may hand out through invitations or role edits.
    pub fn is_assignable(self) -> bool {
        !matches!(self, Self::Owner | Self::Guest)
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "ADMIN" => Ok(Self::Admin),
            "EDITOR" => Ok(Self::Editor),
            "CONTRIBUTOR" => Ok(Self::Contributor),
            "VIEWER" => Ok(Self::Viewer),
            "GUEST" => Ok(Self::Guest),
            _ => Err(EngineError::InvalidRole(format!(
                "invalid member role: {value}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub group_id: Uuid,
    /// Display name captured when the member joined.
    pub username: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Member {
    pub fn new(group_id: Uuid, user_id: Uuid, username: String, role: MemberRole) -> Self {
        Self {
            user_id,
            group_id,
            username,
            role,
            joined_at: Utc::now(),
            is_active: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub joined_at: DateTimeUtc,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Member> for ActiveModel {
    fn from(member: &Member) -> Self {
        Self {
            group_id: ActiveValue::Set(member.group_id.to_string()),
            user_id: ActiveValue::Set(member.user_id.to_string()),
            username: ActiveValue::Set(member.username.clone()),
            role: ActiveValue::Set(member.role.as_str().to_string()),
            joined_at: ActiveValue::Set(member.joined_at),
            is_active: ActiveValue::Set(member.is_active),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_uuid(&model.user_id, "user")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            username: model.username,
            role: MemberRole::try_from(model.role.as_str())?,
            joined_at: model.joined_at,
            is_active: model.is_active,
        })
    }
}
