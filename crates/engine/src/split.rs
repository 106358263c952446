//! Split rules.
//!
//! A transaction's amount is distributed over its participants under one of
//! three modes. Validation runs before anything is written; materialization
//! then produces shares whose sum is exactly the transaction amount.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionSplit};

/// Allowed drift of the percentage sum around 100.
pub const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// Largest accepted amount, for a transaction or a single split.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitMode {
    Equal,
    Percentage,
    Amount,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Amount => "AMOUNT",
        }
    }
}

impl TryFrom<&str> for SplitMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(Self::Equal),
            "PERCENTAGE" => Ok(Self::Percentage),
            "AMOUNT" => Ok(Self::Amount),
            _ => Err(EngineError::InvalidSplit(format!(
                "invalid split mode: {value}"
            ))),
        }
    }
}

/// One participant as submitted by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitInput {
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub percentage: Option<f64>,
}

impl SplitInput {
    pub fn amount(user_id: Uuid, amount_minor: i64) -> Self {
        Self {
            user_id,
            amount_minor,
            percentage: None,
        }
    }

    pub fn percentage(user_id: Uuid, percentage: f64) -> Self {
        Self {
            user_id,
            amount_minor: 0,
            percentage: Some(percentage),
        }
    }
}

/// Checks `splits` against `amount_minor` under `mode`.
pub fn validate_splits(amount_minor: i64, mode: SplitMode, splits: &[SplitInput]) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    if amount_minor > MAX_AMOUNT_MINOR {
        return Err(EngineError::InvalidAmount(format!(
            "amount_minor must be <= {MAX_AMOUNT_MINOR}"
        )));
    }
    if splits.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one split is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(splits.len());
    for split in splits {
        if !seen.insert(split.user_id) {
            return Err(EngineError::InvalidSplit(format!(
                "user {} appears more than once",
                split.user_id
            )));
        }
        if split.amount_minor < 0 {
            return Err(EngineError::InvalidSplit(
                "split amounts must be >= 0".to_string(),
            ));
        }
        if split.amount_minor > MAX_AMOUNT_MINOR {
            return Err(EngineError::InvalidSplit(format!(
                "split amounts must be <= {MAX_AMOUNT_MINOR}"
            )));
        }
    }

    match mode {
        SplitMode::Equal => Ok(()),
        SplitMode::Percentage => {
            let mut total = 0.0;
            for split in splits {
                let Some(pct) = split.percentage else {
                    return Err(EngineError::InvalidSplit(
                        "percentage is required for every split".to_string(),
                    ));
                };
                if !pct.is_finite() || pct < 0.0 {
                    return Err(EngineError::InvalidSplit(
                        "percentages must be >= 0".to_string(),
                    ));
                }
                total += pct;
            }
            if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
                return Err(EngineError::InvalidSplit(format!(
                    "percentages must sum to 100 (got {total})"
                )));
            }
            Ok(())
        }
        SplitMode::Amount => {
            let total = splits
                .iter()
                .try_fold(0_i64, |acc, s| acc.checked_add(s.amount_minor))
                .ok_or_else(|| EngineError::InvalidSplit("split amounts overflow".to_string()))?;
            if total != amount_minor {
                return Err(EngineError::InvalidSplit(format!(
                    "split amounts sum to {total}, expected {amount_minor}"
                )));
            }
            Ok(())
        }
    }
}

/// Validates and turns caller input into stored shares.
///
/// The largest share absorbs the rounding remainder, the earliest one on a
/// tie, so that the shares always sum to `amount_minor`. Under EQUAL that is
/// the first split. A negative remainder larger than that share spills over
/// to the next largest ones.
pub fn materialize_splits(
    amount_minor: i64,
    mode: SplitMode,
    splits: &[SplitInput],
) -> ResultEngine<Vec<TransactionSplit>> {
    validate_splits(amount_minor, mode, splits)?;

    let mut shares: Vec<i64> = match mode {
        SplitMode::Equal => {
            let n = splits.len() as i64;
            vec![amount_minor / n; splits.len()]
        }
        SplitMode::Percentage => splits
            .iter()
            .map(|s| {
                let pct = s.percentage.unwrap_or_default();
                (amount_minor as f64 * pct / 100.0).round() as i64
            })
            .collect(),
        SplitMode::Amount => splits.iter().map(|s| s.amount_minor).collect(),
    };

    let allocated = shares
        .iter()
        .try_fold(0_i64, |acc, share| acc.checked_add(*share))
        .ok_or_else(|| EngineError::InvalidSplit("split amounts overflow".to_string()))?;
    absorb_remainder(&mut shares, amount_minor - allocated)?;

    Ok(splits
        .iter()
        .zip(shares)
        .map(|(input, amount)| TransactionSplit {
            user_id: input.user_id,
            amount_minor: amount,
            percentage: match mode {
                SplitMode::Percentage => input.percentage,
                _ => None,
            },
        })
        .collect())
}

/// Adds `remainder` to the shares, largest first, ties to the earlier split.
fn absorb_remainder(shares: &mut [i64], mut remainder: i64) -> ResultEngine<()> {
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].cmp(&shares[a]).then(a.cmp(&b)));

    if remainder >= 0 {
        if let Some(&largest) = order.first() {
            shares[largest] += remainder;
        }
        return Ok(());
    }
    for i in order {
        let taken = shares[i].min(-remainder);
        shares[i] -= taken;
        remainder += taken;
        if remainder == 0 {
            return Ok(());
        }
    }
    Err(EngineError::InvalidSplit(
        "rounding leaves a negative share".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn equal_split_ignores_submitted_amounts() {
        let ids = users(2);
        let splits = vec![
            SplitInput::amount(ids[0], 150),
            SplitInput::amount(ids[1], 150),
        ];
        let out = materialize_splits(300, SplitMode::Equal, &splits).unwrap();
        assert_eq!(out.iter().map(|s| s.amount_minor).collect::<Vec<_>>(), vec![150, 150]);
    }

    #[test]
    fn equal_split_remainder_goes_to_first() {
        let ids = users(3);
        let splits: Vec<_> = ids.iter().map(|id| SplitInput::amount(*id, 0)).collect();
        let out = materialize_splits(1000, SplitMode::Equal, &splits).unwrap();
        assert_eq!(out.iter().map(|s| s.amount_minor).collect::<Vec<_>>(), vec![334, 333, 333]);
    }

    #[test]
    fn amount_split_must_match_total() {
        let ids = users(2);
        let splits = vec![
            SplitInput::amount(ids[0], 100),
            SplitInput::amount(ids[1], 100),
        ];
        let err = validate_splits(300, SplitMode::Amount, &splits).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));

        let ok = vec![
            SplitInput::amount(ids[0], 100),
            SplitInput::amount(ids[1], 200),
        ];
        assert!(validate_splits(300, SplitMode::Amount, &ok).is_ok());
    }

    #[test]
    fn percentage_tolerance_is_one_hundredth() {
        let ids = users(2);
        let within = vec![
            SplitInput::percentage(ids[0], 50.0),
            SplitInput::percentage(ids[1], 49.995),
        ];
        assert!(validate_splits(100, SplitMode::Percentage, &within).is_ok());

        let outside = vec![
            SplitInput::percentage(ids[0], 50.0),
            SplitInput::percentage(ids[1], 49.0),
        ];
        assert!(matches!(
            validate_splits(100, SplitMode::Percentage, &outside),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn percentage_shares_sum_to_amount() {
        let ids = users(3);
        let splits = vec![
            SplitInput::percentage(ids[0], 33.33),
            SplitInput::percentage(ids[1], 33.33),
            SplitInput::percentage(ids[2], 33.34),
        ];
        let out = materialize_splits(1001, SplitMode::Percentage, &splits).unwrap();
        assert_eq!(out.iter().map(|s| s.amount_minor).sum::<i64>(), 1001);
        assert_eq!(out[1].percentage, Some(33.33));
    }

    #[test]
    fn percentage_remainder_skips_zero_shares() {
        let ids = users(3);
        let splits = vec![
            SplitInput::percentage(ids[0], 0.0),
            SplitInput::percentage(ids[1], 50.0),
            SplitInput::percentage(ids[2], 50.0),
        ];
        let out = materialize_splits(1, SplitMode::Percentage, &splits).unwrap();
        assert_eq!(out.iter().map(|s| s.amount_minor).collect::<Vec<_>>(), vec![0, 0, 1]);

        let within = vec![
            SplitInput::percentage(ids[0], 0.0),
            SplitInput::percentage(ids[1], 100.005),
        ];
        let out = materialize_splits(10000, SplitMode::Percentage, &within).unwrap();
        assert_eq!(out.iter().map(|s| s.amount_minor).collect::<Vec<_>>(), vec![0, 10000]);
    }

    #[test]
    fn percentage_overshoot_spreads_over_shares() {
        let ids = users(6);
        let splits: Vec<_> = ids
            .iter()
            .map(|id| SplitInput::percentage(*id, 16.6667))
            .collect();
        let out = materialize_splits(3, SplitMode::Percentage, &splits).unwrap();
        assert_eq!(
            out.iter().map(|s| s.amount_minor).collect::<Vec<_>>(),
            vec![0, 0, 0, 1, 1, 1]
        );
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let ids = users(3);
        let huge = vec![
            SplitInput::amount(ids[0], i64::MAX),
            SplitInput::amount(ids[1], i64::MAX),
            SplitInput::amount(ids[2], 3),
        ];
        assert!(matches!(
            materialize_splits(1, SplitMode::Amount, &huge),
            Err(EngineError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(
                i64::MAX,
                SplitMode::Amount,
                &[SplitInput::amount(ids[0], i64::MAX), SplitInput::amount(ids[1], 1)]
            ),
            Err(EngineError::InvalidAmount(_))
        ));

        let many: Vec<_> = (0..10_000)
            .map(|_| SplitInput::amount(Uuid::new_v4(), MAX_AMOUNT_MINOR))
            .collect();
        assert!(matches!(
            validate_splits(MAX_AMOUNT_MINOR, SplitMode::Amount, &many),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn percentage_requires_every_share() {
        let ids = users(2);
        let splits = vec![
            SplitInput::percentage(ids[0], 100.0),
            SplitInput::amount(ids[1], 0),
        ];
        assert!(matches!(
            validate_splits(100, SplitMode::Percentage, &splits),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn rejects_empty_duplicate_and_negative() {
        let ids = users(1);
        assert!(matches!(
            validate_splits(100, SplitMode::Equal, &[]),
            Err(EngineError::InvalidSplit(_))
        ));
        let dup = vec![
            SplitInput::amount(ids[0], 50),
            SplitInput::amount(ids[0], 50),
        ];
        assert!(matches!(
            validate_splits(100, SplitMode::Amount, &dup),
            Err(EngineError::InvalidSplit(_))
        ));
        let negative = vec![SplitInput::amount(ids[0], -1)];
        assert!(matches!(
            validate_splits(100, SplitMode::Equal, &negative),
            Err(EngineError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(0, SplitMode::Equal, &[SplitInput::amount(ids[0], 0)]),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn split_mode_round_trips_through_str() {
        for mode in [SplitMode::Equal, SplitMode::Percentage, SplitMode::Amount] {
            assert_eq!(SplitMode::try_from(mode.as_str()).unwrap(), mode);
        }
        assert!(SplitMode::try_from("SHARES").is_err());
    }
}
