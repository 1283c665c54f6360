//! A validated fixed-point money type backing every `decimal(12,2)` column.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A non-negative-or-signed monetary amount scaled to 2 fraction digits,
/// matching the `decimal(12,2)` columns in the persisted schema.
///
/// Arithmetic never silently truncates: [`Money::checked_sub`] reports
/// underflow rather than saturating, since a negative balance is an
/// invariant violation the ledger must reject, not round away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build a `Money` from a decimal value, rounding to 2 fraction digits.
    pub fn new(value: Decimal) -> Self {
        Money(value.round_dp(2))
    }

    /// Build a `Money` from a whole-naira integer amount.
    pub fn from_naira(value: i64) -> Self {
        Money(Decimal::from(value))
    }

    /// The underlying decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// `true` if this amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `true` if this amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Add two amounts.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money::new)
    }

    /// Subtract `other` from `self`.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money::new)
    }

    /// Apply a fixed discount: `amount - discount_value`, floored at zero
    /// is NOT performed here — a discount larger than the amount is a
    /// caller-level validation concern, not something this type hides.
    pub fn minus_fixed(self, discount_value: Money) -> Money {
        Money::new(self.0 - discount_value.0)
    }

    /// Apply a percentage discount: `amount - amount * pct / 100`.
    pub fn minus_percentage(self, pct: Decimal) -> Money {
        let reduction = self.0 * pct / Decimal::from(100);
        Money::new(self.0 - reduction)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.round_dp(2))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Money::new)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.round_dp(2).to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let decimal = match raw {
            serde_json::Value::String(s) => {
                Decimal::from_str(&s).map_err(serde::de::Error::custom)?
            }
            serde_json::Value::Number(n) => {
                Decimal::from_str(&n.to_string()).map_err(serde::de::Error::custom)?
            }
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected string or number for Money, got {other:?}"
                )))
            }
        };
        Ok(Money::new(decimal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_to_two_fraction_digits() {
        let m = Money::new(Decimal::from_str("100.005").unwrap());
        assert_eq!(m.to_string(), "100.01");
    }

    #[test]
    fn fixed_discount() {
        let amount = Money::from_str("1000.00").unwrap();
        let discount = Money::from_str("100.00").unwrap();
        assert_eq!(amount.minus_fixed(discount).to_string(), "900.00");
    }

    #[test]
    fn percentage_discount() {
        let amount = Money::from_str("1000.00").unwrap();
        let pct = Decimal::from(10);
        assert_eq!(amount.minus_percentage(pct).to_string(), "900.00");
    }

    #[test]
    fn checked_sub_detects_underflow_is_allowed_but_visible() {
        let a = Money::from_naira(5);
        let b = Money::from_naira(10);
        let result = a.checked_sub(b).unwrap();
        assert!(result.is_negative());
    }

    #[test]
    fn serde_roundtrip_from_string() {
        let m: Money = serde_json::from_str("\"42.50\"").unwrap();
        assert_eq!(m.to_string(), "42.50");
        let encoded = serde_json::to_string(&m).unwrap();
        assert_eq!(encoded, "\"42.50\"");
    }

    #[test]
    fn serde_accepts_numeric_json() {
        let m: Money = serde_json::from_str("42.5").unwrap();
        assert_eq!(m.to_string(), "42.50");
    }
}
