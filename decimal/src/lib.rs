//! Deterministic arbitrary-precision signed decimal arithmetic.
//!
//! Every monetary or ratio quantity in the engine flows through `FixedDecimal`
//! instead of native floats, so that rounding behavior is the same on every
//! machine and every run. Division truncates toward zero rather than rounding,
//! and never silently produces `NaN` or an infinity.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of fractional digits retained after a division. `Decimal`
/// tops out at 28 significant digits; we truncate to this scale so division
/// results are reproducible regardless of the dividend/divisor magnitudes.
pub const MIN_SCALE: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecimalError {
    #[error("invalid decimal literal: {0}")]
    InvalidLiteral(String),
    #[error("division by zero")]
    DivideByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FixedDecimal(Decimal);

impl FixedDecimal {
    pub const ZERO: FixedDecimal = FixedDecimal(Decimal::ZERO);
    pub const ONE: FixedDecimal = FixedDecimal(Decimal::ONE);

    pub fn new(inner: Decimal) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Parses a decimal literal, rejecting NaN/±∞ tokens (which `Decimal`
    /// itself cannot represent, but which a sloppy upstream string source
    /// such as a JSON number coerced through `f64` could still spell out).
    pub fn parse_from_string(s: &str) -> Result<Self, DecimalError> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.contains("nan") || lower.contains("inf") {
            return Err(DecimalError::InvalidLiteral(s.to_string()));
        }
        Decimal::from_str(trimmed)
            .map(FixedDecimal)
            .map_err(|_| DecimalError::InvalidLiteral(s.to_string()))
    }

    pub fn from_i64(v: i64) -> Self {
        Self(Decimal::from(v))
    }

    pub fn add(&self, other: &FixedDecimal) -> FixedDecimal {
        FixedDecimal(self.0 + other.0)
    }

    pub fn sub(&self, other: &FixedDecimal) -> FixedDecimal {
        FixedDecimal(self.0 - other.0)
    }

    pub fn mul(&self, other: &FixedDecimal) -> FixedDecimal {
        FixedDecimal(self.0 * other.0)
    }

    /// Truncates toward zero to at least `MIN_SCALE` fractional digits.
    /// Banker's rounding is never applied anywhere in this crate.
    pub fn div(&self, other: &FixedDecimal) -> Result<FixedDecimal, DecimalError> {
        if other.0.is_zero() {
            return Err(DecimalError::DivideByZero);
        }
        let raw = self.0 / other.0;
        Ok(FixedDecimal(
            raw.round_dp_with_strategy(MIN_SCALE, RoundingStrategy::ToZero),
        ))
    }

    pub fn abs(&self) -> FixedDecimal {
        FixedDecimal(self.0.abs())
    }

    pub fn neg(&self) -> FixedDecimal {
        FixedDecimal(-self.0)
    }

    pub fn min(&self, other: &FixedDecimal) -> FixedDecimal {
        if self.0 <= other.0 {
            *self
        } else {
            *other
        }
    }

    pub fn max(&self, other: &FixedDecimal) -> FixedDecimal {
        if self.0 >= other.0 {
            *self
        } else {
            *other
        }
    }

    pub fn clamp(&self, lo: &FixedDecimal, hi: &FixedDecimal) -> FixedDecimal {
        self.max(lo).min(hi)
    }

    pub fn compare(&self, other: &FixedDecimal) -> Ordering {
        self.0.cmp(&other.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn to_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FixedDecimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_from_string(s)
    }
}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for FixedDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl From<Decimal> for FixedDecimal {
    fn from(d: Decimal) -> Self {
        FixedDecimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_rejects_nan_and_inf() {
        assert!(FixedDecimal::parse_from_string("NaN").is_err());
        assert!(FixedDecimal::parse_from_string("inf").is_err());
        assert!(FixedDecimal::parse_from_string("-Infinity").is_err());
        assert!(FixedDecimal::parse_from_string("1.23").is_ok());
    }

    #[test]
    fn division_truncates_toward_zero() {
        let a = FixedDecimal::new(dec!(1));
        let b = FixedDecimal::new(dec!(3));
        let q = a.div(&b).unwrap();
        // 1/3 truncated, never rounded up to ...3334
        assert!(q.to_string().starts_with("0.333333333333333333"));

        let neg = FixedDecimal::new(dec!(-1)).div(&b).unwrap();
        assert!(neg.to_string().starts_with("-0.333333333333333333"));
    }

    #[test]
    fn divide_by_zero_errors() {
        let a = FixedDecimal::new(dec!(1));
        assert_eq!(
            a.div(&FixedDecimal::ZERO).unwrap_err(),
            DecimalError::DivideByZero
        );
    }

    #[test]
    fn clamp_bounds_value() {
        let v = FixedDecimal::new(dec!(5));
        let lo = FixedDecimal::new(dec!(0));
        let hi = FixedDecimal::new(dec!(1));
        assert_eq!(v.clamp(&lo, &hi), hi);
    }

    #[test]
    fn sign_predicates() {
        assert!(FixedDecimal::new(dec!(1)).is_positive());
        assert!(FixedDecimal::new(dec!(-1)).is_negative());
        assert!(FixedDecimal::ZERO.is_zero());
        assert!(!FixedDecimal::ZERO.is_positive());
        assert!(!FixedDecimal::ZERO.is_negative());
    }
}
