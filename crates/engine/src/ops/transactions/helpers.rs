use std::collections::HashSet;

use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionCmd, TransactionSplit, materialize_splits};

use super::super::{Engine, normalize_optional_text, normalize_required_name};

/// Normalized, validated content of a [`TransactionCmd`], ready to be written.
pub(super) struct PreparedTransaction {
    pub description: String,
    pub category: Option<String>,
    pub splits: Vec<TransactionSplit>,
}

/// Validation that needs no database access. Runs before any write.
pub(super) fn prepare(cmd: &TransactionCmd) -> ResultEngine<PreparedTransaction> {
    let description = normalize_required_name(&cmd.description, "description")?;
    let category = normalize_optional_text(cmd.category.as_deref());
    let splits = materialize_splits(cmd.amount_minor, cmd.split_mode, &cmd.splits)?;
    Ok(PreparedTransaction {
        description,
        category,
        splits,
    })
}

impl Engine {
    /// The payer and every split participant must be active members.
    pub(super) async fn require_active_participants(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        payer_id: Option<Uuid>,
        splits: &[TransactionSplit],
    ) -> ResultEngine<()> {
        let active: HashSet<Uuid> = self
            .active_members(db, group_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        if let Some(payer_id) = payer_id
            && !active.contains(&payer_id)
        {
            return Err(EngineError::InvalidSplit(format!(
                "payer {payer_id} is not an active member"
            )));
        }
        if let Some(split) = splits.iter().find(|s| !active.contains(&s.user_id)) {
            return Err(EngineError::InvalidSplit(format!(
                "user {} is not an active member",
                split.user_id
            )));
        }
        Ok(())
    }
}
