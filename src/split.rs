//! Turning an expense total and a split rule into per-participant shares.
//!
//! Everything here is pure. Amounts are divided in minor units; whatever is
//! left after flooring each share is handed out one minor unit at a time to
//! participants in list order, so a split always sums exactly to its total.

use crate::error::{LedgerError, Result};
use crate::model::UserId;
use crate::money::Money;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Allowed distance of a percentage total from 100, in percentage points.
pub const PERCENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The rule an expense was split under, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    Equal,
    Exact,
    Percentage,
    Shares,
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitKind::Equal => "equal",
            SplitKind::Exact => "exact",
            SplitKind::Percentage => "percentage",
            SplitKind::Shares => "shares",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(SplitKind::Equal),
            "exact" => Ok(SplitKind::Exact),
            "percentage" => Ok(SplitKind::Percentage),
            "shares" => Ok(SplitKind::Shares),
            other => Err(LedgerError::invalid(format!("unknown split kind '{}'", other))),
        }
    }
}

/// A split rule with its parameters.
///
/// Parameter vectors line up with the participant list by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitRule {
    /// Everyone owes the same amount.
    Equal,

    /// Each participant owes a fixed amount; amounts must add up to the total.
    Exact(Vec<Money>),

    /// Each participant owes a percentage; percentages must add up to 100.
    Percentage(Vec<Decimal>),

    /// Each participant owes in proportion to a whole-number weight.
    Shares(Vec<u32>),
}

impl SplitRule {
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitRule::Equal => SplitKind::Equal,
            SplitRule::Exact(_) => SplitKind::Exact,
            SplitRule::Percentage(_) => SplitKind::Percentage,
            SplitRule::Shares(_) => SplitKind::Shares,
        }
    }
}

/// Validated mapping from participant to the amount they owe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Split {
    shares: BTreeMap<UserId, Money>,
}

impl Split {
    /// Amount owed by `user`, if they take part.
    pub fn get(&self, user: UserId) -> Option<Money> {
        self.shares.get(&user).copied()
    }

    pub fn total(&self) -> Money {
        self.shares.values().sum()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Participants and their shares in user id order.
    pub fn iter(&self) -> btree_map::Iter<'_, UserId, Money> {
        self.shares.iter()
    }
}

impl FromIterator<(UserId, Money)> for Split {
    fn from_iter<I: IntoIterator<Item = (UserId, Money)>>(iter: I) -> Self {
        Split {
            shares: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Split {
    type Item = (&'a UserId, &'a Money);
    type IntoIter = btree_map::Iter<'a, UserId, Money>;

    fn into_iter(self) -> Self::IntoIter {
        self.shares.iter()
    }
}

/// Stateless split computations.
pub struct SplitCalculator;

impl SplitCalculator {
    /// Splits `amount` according to `rule`.
    pub fn compute(amount: Money, participants: &[UserId], rule: &SplitRule) -> Result<Split> {
        match rule {
            SplitRule::Equal => Self::equal(amount, participants),
            SplitRule::Exact(amounts) => Self::exact(amount, participants, amounts),
            SplitRule::Percentage(percentages) => {
                Self::percentage(amount, participants, percentages)
            }
            SplitRule::Shares(weights) => Self::shares(amount, participants, weights),
        }
    }

    /// Divides `amount` evenly.
    ///
    /// Leftover minor units go one each to the first participants in list
    /// order: 100.00 over three people is 33.34, 33.33, 33.33.
    pub fn equal(amount: Money, participants: &[UserId]) -> Result<Split> {
        check_common(amount, participants)?;
        let weights = vec![Decimal::ONE; participants.len()];
        allocate(amount, participants, &weights)
    }

    /// Uses the given amounts as-is after checking they add up to `amount`.
    pub fn exact(amount: Money, participants: &[UserId], amounts: &[Money]) -> Result<Split> {
        check_common(amount, participants)?;
        check_len(participants, amounts.len(), "exact amounts")?;
        if let Some(negative) = amounts.iter().find(|a| a.is_negative()) {
            return Err(LedgerError::invalid(format!(
                "exact amount {} is negative",
                negative
            )));
        }

        let total: Money = amounts.iter().sum();
        if !total.approx_eq(amount) {
            return Err(LedgerError::validation(format!(
                "exact amounts sum to {} but the expense is {}",
                total, amount
            )));
        }

        Ok(participants.iter().copied().zip(amounts.iter().copied()).collect())
    }

    /// Splits by percentage; percentages must sum to 100 within
    /// [`PERCENT_TOLERANCE`].
    pub fn percentage(
        amount: Money,
        participants: &[UserId],
        percentages: &[Decimal],
    ) -> Result<Split> {
        check_common(amount, participants)?;
        check_len(participants, percentages.len(), "percentages")?;
        if let Some(negative) = percentages.iter().find(|p| p.is_sign_negative() && !p.is_zero()) {
            return Err(LedgerError::invalid(format!(
                "percentage {} is negative",
                negative
            )));
        }

        let total: Decimal = percentages.iter().sum();
        if (total - Decimal::ONE_HUNDRED).abs() > PERCENT_TOLERANCE {
            return Err(LedgerError::validation(format!(
                "percentages sum to {}%, expected 100%",
                total
            )));
        }

        allocate(amount, participants, percentages)
    }

    /// Splits in proportion to whole-number weights.
    pub fn shares(amount: Money, participants: &[UserId], weights: &[u32]) -> Result<Split> {
        check_common(amount, participants)?;
        check_len(participants, weights.len(), "share weights")?;
        let weights: Vec<Decimal> = weights.iter().map(|&w| Decimal::from(w)).collect();
        if weights.iter().all(|w| w.is_zero()) {
            return Err(LedgerError::invalid("share weights must not all be zero"));
        }

        allocate(amount, participants, &weights)
    }
}

fn check_common(amount: Money, participants: &[UserId]) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::invalid(format!(
            "expense amount must be positive, got {}",
            amount
        )));
    }
    if participants.is_empty() {
        return Err(LedgerError::invalid("an expense needs at least one participant"));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for user in participants {
        if !seen.insert(*user) {
            return Err(LedgerError::invalid(format!(
                "participant {} is listed more than once",
                user
            )));
        }
    }
    Ok(())
}

fn check_len(participants: &[UserId], given: usize, what: &str) -> Result<()> {
    if given != participants.len() {
        return Err(LedgerError::invalid(format!(
            "{} {} given for {} participants",
            given,
            what,
            participants.len()
        )));
    }
    Ok(())
}

/// Proportional allocation in minor units.
///
/// Each share is floored; the remainder is strictly less than the number of
/// non-zero weights and goes one unit each to those participants in list order.
fn allocate(amount: Money, participants: &[UserId], weights: &[Decimal]) -> Result<Split> {
    let total_weight: Decimal = weights.iter().sum();
    let total_units = amount.minor_units();
    let total_dec = Decimal::from_i128_with_scale(total_units, 0);
    let too_large = || LedgerError::invalid(format!("amount {} is too large to split", amount));

    let mut units = Vec::with_capacity(weights.len());
    for weight in weights {
        if weight.is_zero() {
            units.push(0i128);
            continue;
        }
        let share = total_dec
            .checked_mul(*weight)
            .and_then(|scaled| scaled.checked_div(total_weight))
            .ok_or_else(too_large)?;
        units.push(share.floor().to_i128().ok_or_else(too_large)?);
    }

    let mut leftover = total_units - units.iter().sum::<i128>();
    for (slot, weight) in units.iter_mut().zip(weights) {
        if leftover == 0 {
            break;
        }
        if !weight.is_zero() {
            *slot += 1;
            leftover -= 1;
        }
    }
    debug_assert_eq!(leftover, 0);

    participants
        .iter()
        .copied()
        .zip(units)
        .map(|(user, units)| Ok((user, Money::try_from_minor_units(units)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn pct(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const A: UserId = UserId(1);
    const B: UserId = UserId(2);
    const C: UserId = UserId(3);

    #[test]
    fn test_equal_split_divides_evenly() {
        let split = SplitCalculator::equal(money("90"), &[A, B, C]).unwrap();

        assert_eq!(split.get(A), Some(money("30")));
        assert_eq!(split.get(B), Some(money("30")));
        assert_eq!(split.get(C), Some(money("30")));
        assert_eq!(split.total(), money("90"));
    }

    #[test]
    fn test_equal_split_remainder_goes_to_first_in_list_order() {
        let split = SplitCalculator::equal(money("100"), &[C, A, B]).unwrap();

        assert_eq!(split.get(C), Some(money("33.34")));
        assert_eq!(split.get(A), Some(money("33.33")));
        assert_eq!(split.get(B), Some(money("33.33")));
        assert_eq!(split.total(), money("100"));

        let split = SplitCalculator::equal(money("0.05"), &[A, B, C]).unwrap();
        assert_eq!(split.get(A), Some(money("0.02")));
        assert_eq!(split.get(B), Some(money("0.02")));
        assert_eq!(split.get(C), Some(money("0.01")));
    }

    #[test]
    fn test_exact_split_accepts_matching_total() {
        let amounts = [money("100"), money("150"), money("50")];
        let split = SplitCalculator::exact(money("300"), &[A, B, C], &amounts).unwrap();

        assert_eq!(split.get(B), Some(money("150")));
        assert_eq!(split.total(), money("300"));
    }

    #[test]
    fn test_exact_split_mismatch_is_validation_error() {
        let amounts = [money("100"), money("100"), money("50")];
        let err = SplitCalculator::exact(money("300"), &[A, B, C], &amounts).unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_exact_split_off_by_one_cent_is_rejected() {
        let amounts = [money("100"), money("100"), money("99.99")];
        let err = SplitCalculator::exact(money("300"), &[A, B, C], &amounts).unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_exact_split_rejects_negative_amount() {
        let amounts = [money("400"), money("-100")];
        let err = SplitCalculator::exact(money("300"), &[A, B], &amounts).unwrap_err();

        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_percentage_split_accepts_hundred() {
        let pcts = [pct("40"), pct("40"), pct("20")];
        let split = SplitCalculator::percentage(money("250"), &[A, B, C], &pcts).unwrap();

        assert_eq!(split.get(A), Some(money("100")));
        assert_eq!(split.get(B), Some(money("100")));
        assert_eq!(split.get(C), Some(money("50")));
    }

    #[test]
    fn test_percentage_split_over_hundred_is_validation_error() {
        let pcts = [pct("40"), pct("40"), pct("30")];
        let err = SplitCalculator::percentage(money("250"), &[A, B, C], &pcts).unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_percentage_split_within_tolerance_still_sums_exactly() {
        let pcts = [pct("33.33"), pct("33.33"), pct("33.33")];
        let split = SplitCalculator::percentage(money("100"), &[A, B, C], &pcts).unwrap();

        assert_eq!(split.total(), money("100"));
        assert_eq!(split.get(A), Some(money("33.34")));
    }

    #[test]
    fn test_percentage_split_rejects_negative() {
        let pcts = [pct("120"), pct("-20")];
        let err = SplitCalculator::percentage(money("10"), &[A, B], &pcts).unwrap_err();

        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_shares_split_is_proportional() {
        let split = SplitCalculator::shares(money("120"), &[A, B, C], &[1, 2, 3]).unwrap();

        assert_eq!(split.get(A), Some(money("20")));
        assert_eq!(split.get(B), Some(money("40")));
        assert_eq!(split.get(C), Some(money("60")));
    }

    #[test]
    fn test_shares_split_remainder_skips_zero_weights() {
        let split = SplitCalculator::shares(money("0.10"), &[A, B, C], &[0, 1, 2]).unwrap();

        assert_eq!(split.get(A), Some(Money::ZERO));
        assert_eq!(split.get(B), Some(money("0.04")));
        assert_eq!(split.get(C), Some(money("0.06")));
        assert_eq!(split.total(), money("0.10"));
    }

    #[test]
    fn test_shares_split_rejects_all_zero_weights() {
        let err = SplitCalculator::shares(money("10"), &[A, B], &[0, 0]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_common_input_checks() {
        let err = SplitCalculator::equal(money("10"), &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = SplitCalculator::equal(money("10"), &[A, B, A]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = SplitCalculator::equal(Money::ZERO, &[A, B]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = SplitCalculator::equal(money("-5"), &[A, B]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_mis_sized_parameters_are_invalid_input() {
        let err = SplitCalculator::exact(money("10"), &[A, B], &[money("10")]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = SplitCalculator::percentage(money("10"), &[A], &[pct("50"), pct("50")])
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = SplitCalculator::shares(money("10"), &[A, B, C], &[1, 1]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_compute_dispatches_on_rule() {
        let rule = SplitRule::Shares(vec![1, 1]);
        let split = SplitCalculator::compute(money("10"), &[A, B], &rule).unwrap();

        assert_eq!(rule.kind(), SplitKind::Shares);
        assert_eq!(split.get(A), Some(money("5")));
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_largest_amount_still_splits_to_the_cent() {
        let amount = Money::from_minor_units(Money::MAX_MINOR_UNITS);

        let split = SplitCalculator::equal(amount, &[A, B, C]).unwrap();
        assert_eq!(split.total(), amount);
        assert_eq!(split.get(A).unwrap().minor_units(), 33_333_333_333_333_333_334);

        let split =
            SplitCalculator::percentage(amount, &[A, B, C], &[pct("33.33"), pct("33.33"), pct("33.34")])
                .unwrap();
        assert_eq!(split.total(), amount);
    }

    #[test]
    fn test_amount_beyond_cents_never_reaches_the_calculator() {
        let err = Money::from_str("1000000000000000000000000000").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_split_kind_parsing() {
        assert_eq!(SplitKind::from_str(" Percentage ").unwrap(), SplitKind::Percentage);
        assert_eq!(SplitKind::Exact.to_string(), "exact");
        assert!(SplitKind::from_str("thirds").is_err());
    }
}
