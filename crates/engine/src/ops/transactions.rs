use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, TransactionSplit, transaction_splits, transactions};

use super::Engine;

mod helpers;
mod list;
mod write;

pub use list::TransactionPage;

impl Engine {
    pub(super) async fn require_transaction_in_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Converts rows and attaches their splits in stored order.
    pub(super) async fn hydrate_transactions(
        &self,
        db: &DatabaseTransaction,
        models: Vec<transactions::Model>,
    ) -> ResultEngine<Vec<Transaction>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let split_models = transaction_splits::Entity::find()
            .filter(transaction_splits::Column::TransactionId.is_in(ids))
            .order_by_asc(transaction_splits::Column::TransactionId)
            .order_by_asc(transaction_splits::Column::Position)
            .all(db)
            .await?;

        let mut by_tx: HashMap<String, Vec<TransactionSplit>> = HashMap::new();
        for model in split_models {
            let tx_id = model.transaction_id.clone();
            by_tx
                .entry(tx_id)
                .or_default()
                .push(TransactionSplit::try_from(model)?);
        }

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let splits = by_tx.remove(&model.id).unwrap_or_default();
            let mut tx = Transaction::try_from(model)?;
            tx.splits = splits;
            out.push(tx);
        }
        Ok(out)
    }

    /// Every transaction of a group, oldest first.
    pub(super) async fn group_transactions(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(transactions::Column::Id)
            .all(db)
            .await?;
        self.hydrate_transactions(db, models).await
    }
}
