use std::collections::HashMap;

use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Member, MemberRole, ResultEngine, Transaction, TransactionKind};

use super::{Engine, with_tx};

/// Totals of one member over a group's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub user_id: Uuid,
    pub username: String,
    pub role: MemberRole,
    pub paid_minor: i64,
    pub received_minor: i64,
    /// Positive: the group owes the member. Negative: the member owes.
    pub balance_minor: i64,
}

impl Engine {
    /// Per-member paid / received / net balance of a group.
    ///
    /// Balances always sum to zero across the group.
    pub async fn member_balances(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Vec<MemberBalance>> {
        with_tx!(self, |db_tx| {
            self.require_any_membership(&db_tx, group_id, user_id)
                .await?;
            let members = self.active_members(&db_tx, group_id).await?;
            let transactions = self.group_transactions(&db_tx, group_id).await?;
            compute_balances(&members, &transactions)
        })
    }
}

/// Replays `transactions` for `members`.
///
/// For a CREDIT the payer is credited the whole amount minus their own share
/// and every other participant is debited their share; a DEBIT is the mirror
/// image.
pub(crate) fn compute_balances(
    members: &[Member],
    transactions: &[Transaction],
) -> ResultEngine<Vec<MemberBalance>> {
    let mut out: Vec<MemberBalance> = members
        .iter()
        .map(|m| MemberBalance {
            user_id: m.user_id,
            username: m.username.clone(),
            role: m.role,
            paid_minor: 0,
            received_minor: 0,
            balance_minor: 0,
        })
        .collect();
    let index: HashMap<Uuid, usize> = out.iter().enumerate().map(|(i, b)| (b.user_id, i)).collect();

    for tx in transactions {
        let payer = tx.effective_payer();
        let shares: HashMap<Uuid, i64> = tx.splits.iter().map(|s| (s.user_id, s.amount_minor)).collect();
        for (user_id, &i) in &index {
            let share = shares.get(user_id).copied().unwrap_or(0);
            let is_payer = *user_id == payer;
            let entry = &mut out[i];
            match tx.kind {
                TransactionKind::Credit => {
                    if is_payer {
                        shift(&mut entry.paid_minor, tx.amount_minor)?;
                        shift(&mut entry.balance_minor, tx.amount_minor - share)?;
                    } else {
                        shift(&mut entry.balance_minor, -share)?;
                    }
                    shift(&mut entry.received_minor, share)?;
                }
                TransactionKind::Debit => {
                    if is_payer {
                        shift(&mut entry.received_minor, tx.amount_minor)?;
                        shift(&mut entry.balance_minor, share - tx.amount_minor)?;
                    } else {
                        shift(&mut entry.balance_minor, share)?;
                    }
                    shift(&mut entry.paid_minor, share)?;
                }
            }
        }
    }
    Ok(out)
}

fn shift(total: &mut i64, delta: i64) -> ResultEngine<()> {
    *total = total
        .checked_add(delta)
        .ok_or_else(|| EngineError::InvalidAmount("balance out of range".to_string()))?;
    Ok(())
}
