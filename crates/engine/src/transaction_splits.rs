//! Per-participant shares of a transaction.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionSplit {
    pub user_id: Uuid,
    pub amount_minor: i64,
    /// Only set for PERCENTAGE transactions.
    pub percentage: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub amount_minor: i64,
    pub percentage: Option<f64>,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_delete = "Cascade"
    )]
    Transaction,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(
    transaction_id: Uuid,
    position: usize,
    split: &TransactionSplit,
) -> ActiveModel {
    ActiveModel {
        transaction_id: ActiveValue::Set(transaction_id.to_string()),
        user_id: ActiveValue::Set(split.user_id.to_string()),
        amount_minor: ActiveValue::Set(split.amount_minor),
        percentage: ActiveValue::Set(split.percentage),
        position: ActiveValue::Set(position as i32),
    }
}

impl TryFrom<Model> for TransactionSplit {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_uuid(&model.user_id, "user")?,
            amount_minor: model.amount_minor,
            percentage: model.percentage,
        })
    }
}
