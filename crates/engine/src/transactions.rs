//! Transaction primitives.
//!
//! A `Transaction` belongs to one group and carries its ordered
//! `TransactionSplit`s. The pair is written and deleted as a unit.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, SplitMode, TransactionSplit, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money spent on behalf of the split participants.
    Debit,
    /// Money received and distributed to the split participants.
    Credit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            _ => Err(EngineError::InvalidInput(format!(
                "invalid transaction kind: {value}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub group_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: String,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Display name of the creator when the transaction was recorded.
    pub created_by: String,
    pub created_by_id: Uuid,
    pub payer_id: Option<Uuid>,
    pub split_mode: SplitMode,
    pub updated_at: DateTime<Utc>,
    pub splits: Vec<TransactionSplit>,
}

impl Transaction {
    /// The member who advanced the money, falling back to the creator.
    pub fn effective_payer(&self) -> Uuid {
        self.payer_id.unwrap_or(self.created_by_id)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub category: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub created_by_id: String,
    pub payer_id: Option<String>,
    pub split_mode: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_splits::Entity")]
    Splits,
}

impl Related<super::transaction_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            group_id: ActiveValue::Set(tx.group_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            description: ActiveValue::Set(tx.description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            created_by_id: ActiveValue::Set(tx.created_by_id.to_string()),
            payer_id: ActiveValue::Set(tx.payer_id.map(|id| id.to_string())),
            split_mode: ActiveValue::Set(tx.split_mode.as_str().to_string()),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            description: model.description,
            category: model.category,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
            created_by_id: parse_uuid(&model.created_by_id, "user")?,
            payer_id: model
                .payer_id
                .as_deref()
                .map(|id| parse_uuid(id, "user"))
                .transpose()?,
            split_mode: SplitMode::try_from(model.split_mode.as_str())?,
            updated_at: model.updated_at,
            splits: Vec::new(),
        })
    }
}
