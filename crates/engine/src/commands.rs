//! Command structs for engine operations.
//!
//! These types group parameters for transaction writes, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{SplitInput, SplitMode, TransactionKind};

/// Create or fully replace a group transaction.
///
/// The same command is used for updates: every field, splits included, is
/// overwritten.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: String,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub payer_id: Option<Uuid>,
    pub split_mode: SplitMode,
    pub splits: Vec<SplitInput>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            user_id,
            kind,
            amount_minor,
            description: description.into(),
            category: None,
            occurred_at,
            payer_id: None,
            split_mode: SplitMode::Equal,
            splits: Vec::new(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn payer(mut self, payer_id: Uuid) -> Self {
        self.payer_id = Some(payer_id);
        self
    }

    #[must_use]
    pub fn split_mode(mut self, mode: SplitMode) -> Self {
        self.split_mode = mode;
        self
    }

    #[must_use]
    pub fn splits(mut self, splits: Vec<SplitInput>) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitInput) -> Self {
        self.splits.push(split);
        self
    }
}
