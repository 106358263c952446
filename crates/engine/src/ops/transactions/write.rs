use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    MemberRole, ResultEngine, Transaction, TransactionCmd, TransactionSplit, transaction_splits,
    transactions,
};

use super::helpers::prepare;
use super::super::{Engine, with_tx};

impl Engine {
    /// Records a transaction with its splits (contributor or above).
    pub async fn create_transaction(&self, cmd: TransactionCmd) -> ResultEngine<Transaction> {
        let prepared = prepare(&cmd)?;
        let tx = with_tx!(self, |db_tx| {
            let (_, author) = self
                .require_role(&db_tx, cmd.group_id, cmd.user_id, MemberRole::Contributor)
                .await?;
            self.require_active_participants(&db_tx, cmd.group_id, cmd.payer_id, &prepared.splits)
                .await?;

            let now = Utc::now();
            let tx = Transaction {
                id: Uuid::new_v4(),
                group_id: cmd.group_id,
                kind: cmd.kind,
                amount_minor: cmd.amount_minor,
                description: prepared.description,
                category: prepared.category,
                occurred_at: cmd.occurred_at,
                created_by: author.username,
                created_by_id: cmd.user_id,
                payer_id: cmd.payer_id,
                split_mode: cmd.split_mode,
                updated_at: now,
                splits: prepared.splits,
            };
            let model: transactions::ActiveModel = (&tx).into();
            model.insert(&db_tx).await?;
            insert_splits(&db_tx, tx.id, &tx.splits).await?;
            Ok(tx)
        })?;
        tracing::debug!(transaction_id = %tx.id, group_id = %tx.group_id, "transaction created");
        Ok(tx)
    }

    /// Overwrites a transaction and replaces all of its splits (editor or
    /// above). The creator attribution is kept.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        cmd: TransactionCmd,
    ) -> ResultEngine<Transaction> {
        let prepared = prepare(&cmd)?;
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, cmd.group_id, cmd.user_id, MemberRole::Editor)
                .await?;
            let existing = self
                .require_transaction_in_group(&db_tx, cmd.group_id, transaction_id)
                .await?;
            self.require_active_participants(&db_tx, cmd.group_id, cmd.payer_id, &prepared.splits)
                .await?;

            let mut tx = Transaction::try_from(existing)?;
            tx.kind = cmd.kind;
            tx.amount_minor = cmd.amount_minor;
            tx.description = prepared.description;
            tx.category = prepared.category;
            tx.occurred_at = cmd.occurred_at;
            tx.payer_id = cmd.payer_id;
            tx.split_mode = cmd.split_mode;
            tx.updated_at = Utc::now();
            tx.splits = prepared.splits;

            let model: transactions::ActiveModel = (&tx).into();
            model.update(&db_tx).await?;
            delete_splits(&db_tx, tx.id).await?;
            insert_splits(&db_tx, tx.id, &tx.splits).await?;
            Ok(tx)
        })
    }

    /// Deletes a transaction and its splits (editor or above).
    pub async fn delete_transaction(
        &self,
        group_id: Uuid,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, group_id, user_id, MemberRole::Editor)
                .await?;
            self.require_transaction_in_group(&db_tx, group_id, transaction_id)
                .await?;
            delete_splits(&db_tx, transaction_id).await?;
            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}

async fn insert_splits(
    db: &DatabaseTransaction,
    transaction_id: Uuid,
    splits: &[TransactionSplit],
) -> ResultEngine<()> {
    let models: Vec<transaction_splits::ActiveModel> = splits
        .iter()
        .enumerate()
        .map(|(position, split)| transaction_splits::active_model(transaction_id, position, split))
        .collect();
    transaction_splits::Entity::insert_many(models).exec(db).await?;
    Ok(())
}

async fn delete_splits(db: &DatabaseTransaction, transaction_id: Uuid) -> ResultEngine<()> {
    transaction_splits::Entity::delete_many()
        .filter(transaction_splits::Column::TransactionId.eq(transaction_id.to_string()))
        .exec(db)
        .await?;
    Ok(())
}
