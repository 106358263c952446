//! Invitations: a PENDING row resolves exactly once into ACCEPTED or REJECTED.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MemberRole, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl TryFrom<&str> for InvitationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid invitation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    pub inviter_id: Uuid,
    pub inviter_name: String,
    pub invitee_id: Option<Uuid>,
    pub invitee_email: String,
    pub role: MemberRole,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub group_name: String,
    pub inviter_id: String,
    pub inviter_name: String,
    pub invitee_id: Option<String>,
    pub invitee_email: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub responded_at: Option<DateTimeUtc>,
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

impl From<&Invitation> for ActiveModel {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: ActiveValue::Set(invitation.id.to_string()),
            group_id: ActiveValue::Set(invitation.group_id.to_string()),
            group_name: ActiveValue::Set(invitation.group_name.clone()),
            inviter_id: ActiveValue::Set(invitation.inviter_id.to_string()),
            inviter_name: ActiveValue::Set(invitation.inviter_name.clone()),
            invitee_id: ActiveValue::Set(invitation.invitee_id.map(|id| id.to_string())),
            invitee_email: ActiveValue::Set(invitation.invitee_email.clone()),
            role: ActiveValue::Set(invitation.role.as_str().to_string()),
            status: ActiveValue::Set(invitation.status.as_str().to_string()),
            created_at: ActiveValue::Set(invitation.created_at),
            responded_at: ActiveValue::Set(invitation.responded_at),
        }
    }
}

impl TryFrom<Model> for Invitation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "invitation")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            group_name: model.group_name,
            inviter_id: parse_uuid(&model.inviter_id, "user")?,
            inviter_name: model.inviter_name,
            invitee_id: model
                .invitee_id
                .as_deref()
                .map(|id| parse_uuid(id, "user"))
                .transpose()?,
            invitee_email: model.invitee_email,
            role: MemberRole::try_from(model.role.as_str())?,
            status: InvitationStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            responded_at: model.responded_at,
        })
    }
}
