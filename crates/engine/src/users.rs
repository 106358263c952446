//! Users table.
//!
//! A user is never deleted: splits, payers and creators keep pointing at it
//! after the person leaves a group. Guests are synthetic users with neither a
//! password nor an external subject.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// Email domain reserved for synthetic guest accounts.
pub const GUEST_EMAIL_DOMAIN: &str = "guest.invalid";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub external_subject: Option<String>,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub external_subject: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let is_guest = model.password_hash.is_none()
            && model.external_subject.is_none()
            && model.email.ends_with(GUEST_EMAIL_DOMAIN);
        Ok(Self {
            id: parse_uuid(&model.id, "user")?,
            username: model.username,
            email: model.email,
            external_subject: model.external_subject,
            is_guest,
            created_at: model.created_at,
        })
    }
}
