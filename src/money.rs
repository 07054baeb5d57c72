//! Fixed-point money type with two decimal places (cents).
//!
//! Uses `rust_decimal` internally with scale enforcement so every value is an
//! exact multiple of one minor unit. Text carrying more precision than that is
//! rejected rather than rounded.

use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// An amount of money held as an exact number of minor units.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use ledger_engine::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert_eq!(amount.minor_units(), 1050);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Tolerance ε: one minor unit. Any discrepancy strictly below it is zero.
    pub const EPSILON: Self = Money(Decimal::from_parts(1, 0, 0, false, Self::SCALE));

    /// Largest magnitude accepted from outside, in minor units.
    ///
    /// Leaves room for balances to accumulate without overflowing `Decimal`.
    pub const MAX_MINOR_UNITS: i128 = 100_000_000_000_000_000_000;

    /// Creates a new `Money` from a `Decimal`, normalizing to two decimal places.
    fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        Money(normalized)
    }

    /// Normalizes `value` to two decimal places, rejecting anything that
    /// cannot be held as an exact count of minor units within range.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        let money = Money::new(value);
        if money.0.scale() != Self::SCALE || money.minor_units().abs() > Self::MAX_MINOR_UNITS {
            return Err(out_of_range(value));
        }
        Ok(money)
    }

    /// Builds an amount from a count of minor units (cents).
    ///
    /// # Panics
    ///
    /// Panics if `units` does not fit in a `Decimal` mantissa. Use
    /// [`Money::try_from_minor_units`] for untrusted counts.
    pub fn from_minor_units(units: i128) -> Self {
        Money(Decimal::from_i128_with_scale(units, Self::SCALE))
    }

    /// Builds an amount from a count of minor units, checking the range.
    pub fn try_from_minor_units(units: i128) -> Result<Self> {
        if units.unsigned_abs() > Self::MAX_MINOR_UNITS.unsigned_abs() {
            return Err(LedgerError::invalid(format!(
                "{} minor units is out of range",
                units
            )));
        }
        Decimal::try_from_i128_with_scale(units, Self::SCALE)
            .map(Money)
            .map_err(|e| LedgerError::invalid(format!("{} minor units: {}", units, e)))
    }

    /// Returns the amount as a count of minor units.
    pub fn minor_units(&self) -> i128 {
        self.0.mantissa()
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is strictly above zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if this value is strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `true` when `|self| < ε`.
    pub fn is_negligible(&self) -> bool {
        self.abs() < Self::EPSILON
    }

    /// Returns `true` when `self` and `other` differ by less than ε.
    pub fn approx_eq(&self, other: Money) -> bool {
        (*self - other).is_negligible()
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let decimal = Decimal::from_str(trimmed)
            .map_err(|e| LedgerError::invalid(format!("'{}' is not an amount: {}", trimmed, e)))?;
        if decimal.normalize().scale() > Self::SCALE {
            return Err(LedgerError::invalid(format!(
                "'{}' is more precise than one minor unit",
                trimmed
            )));
        }
        Money::from_decimal(decimal)
    }
}

fn out_of_range(value: Decimal) -> LedgerError {
    LedgerError::invalid(format!("amount {} is out of range", value))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money::new(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money::new(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_normalizes_scale() {
        let m = Money::from_str("1").unwrap();
        assert_eq!(m.to_string(), "1.00");

        let m = Money::from_str("1.5").unwrap();
        assert_eq!(m.to_string(), "1.50");

        let m = Money::from_str("  2.25  ").unwrap();
        assert_eq!(m.to_string(), "2.25");

        let m = Money::from_str("3.1000").unwrap();
        assert_eq!(m.to_string(), "3.10");
    }

    #[test]
    fn test_from_str_rejects_sub_cent_precision() {
        let err = Money::from_str("1.005").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_from_str_rejects_amounts_too_large_for_cents() {
        // 28 significant digits cannot be rescaled to two decimal places.
        let err = Money::from_str("1000000000000000000000000000").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = Money::from_str("-1000000000000000000001").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let max = Money::from_str("1000000000000000000").unwrap();
        assert_eq!(max.minor_units(), Money::MAX_MINOR_UNITS);
    }

    #[test]
    fn test_try_from_minor_units_checks_range() {
        assert_eq!(
            Money::try_from_minor_units(1234).unwrap(),
            Money::from_str("12.34").unwrap()
        );
        assert!(Money::try_from_minor_units(Money::MAX_MINOR_UNITS + 1).is_err());
        assert!(Money::try_from_minor_units(i128::MIN + 1).is_err());
    }

    #[test]
    fn test_from_decimal_always_holds_cents() {
        let m = Money::from_decimal(Decimal::new(5, 0)).unwrap();
        assert_eq!(m.minor_units(), 500);
        assert!(Money::from_decimal(Decimal::MAX).is_err());
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!(Money::from_str("ten").is_err());
        assert!(Money::from_str("").is_err());
    }

    #[test]
    fn test_minor_units_round_trip() {
        let m = Money::from_str("12.34").unwrap();
        assert_eq!(m.minor_units(), 1234);
        assert_eq!(Money::from_minor_units(1234), m);
        assert_eq!(Money::from_minor_units(-5).to_string(), "-0.05");
    }

    #[test]
    fn test_arithmetic_preserves_scale() {
        let a = Money::from_str("1.5").unwrap();
        let b = Money::from_str("2.5").unwrap();

        assert_eq!((a + b).to_string(), "4.00");
        assert_eq!((b - a).to_string(), "1.00");
        assert_eq!((-a).to_string(), "-1.50");
        assert_eq!((a - b).minor_units(), -100);
    }

    #[test]
    fn test_sum() {
        let values = [
            Money::from_str("30").unwrap(),
            Money::from_str("30").unwrap(),
            Money::from_str("30.01").unwrap(),
        ];
        let total: Money = values.iter().sum();
        assert_eq!(total.to_string(), "90.01");
    }

    #[test]
    fn test_epsilon_is_one_minor_unit() {
        assert_eq!(Money::EPSILON, Money::from_minor_units(1));
        assert!(Money::ZERO.is_negligible());
        assert!(!Money::EPSILON.is_negligible());
        assert!(!Money::from_minor_units(-1).is_negligible());
        assert!(Money::from_minor_units(100).approx_eq(Money::from_str("1").unwrap()));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(Money::from_minor_units(1).is_positive());
        assert!(Money::from_minor_units(-1).is_negative());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
    }
}
