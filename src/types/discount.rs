//! Per-merchant, per-product pricing adjustments.

use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a discount subtracts a flat amount or a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Subtract a flat `Money` amount.
    Fixed,
    /// Subtract `amount * value / 100`.
    Percentage,
}

/// An active or inactive discount row for (merchant, product).
///
/// Only active rows apply; when multiple active rows exist for the same
/// (merchant, product), the one with the maximum `discount_value` wins
/// (ties broken by whichever the aggregate query returns first).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantDiscount {
    /// Internal identifier.
    pub id: i64,
    /// Owning merchant.
    pub merchant_id: i64,
    /// Owning product.
    pub product_id: i64,
    /// Fixed or percentage.
    pub discount_type: DiscountType,
    /// Flat `Money` value if `Fixed`, percentage points if `Percentage`.
    pub discount_value: Decimal,
    /// Whether this row currently applies.
    pub is_active: bool,
}

/// The resolved best discount for a (merchant, product) pair, or none.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedDiscount {
    /// Fixed or percentage.
    pub discount_type: DiscountType,
    /// Flat `Money` value if `Fixed`, percentage points if `Percentage`.
    pub discount_value: Decimal,
}

impl ResolvedDiscount {
    /// Apply this discount to `amount`, per spec step 4.7.5:
    /// `fixed -> amount - discount_value`, `percentage -> amount -
    /// amount * discount_value / 100`.
    pub fn apply(&self, amount: Money) -> Money {
        match self.discount_type {
            DiscountType::Fixed => amount.minus_fixed(Money::new(self.discount_value)),
            DiscountType::Percentage => amount.minus_percentage(self.discount_value),
        }
    }
}

/// Pick the maximum-value active discount across candidate rows for a
/// single (merchant, product) pair — the aggregate-query equivalent of
/// `MAX(discount_value)` with its matching `discount_type`.
pub fn resolve_best_discount(rows: &[MerchantDiscount]) -> Option<ResolvedDiscount> {
    rows.iter()
        .filter(|r| r.is_active)
        .max_by(|a, b| a.discount_value.cmp(&b.discount_value))
        .map(|best| ResolvedDiscount {
            discount_type: best.discount_type,
            discount_value: best.discount_value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(id: i64, kind: DiscountType, value: &str, active: bool) -> MerchantDiscount {
        MerchantDiscount {
            id,
            merchant_id: 1,
            product_id: 1,
            discount_type: kind,
            discount_value: Decimal::from_str(value).unwrap(),
            is_active: active,
        }
    }

    #[test]
    fn inactive_rows_are_ignored() {
        let rows = vec![row(1, DiscountType::Fixed, "50", false)];
        assert!(resolve_best_discount(&rows).is_none());
    }

    #[test]
    fn picks_maximum_value_among_active_rows() {
        let rows = vec![
            row(1, DiscountType::Percentage, "5", true),
            row(2, DiscountType::Percentage, "10", true),
            row(3, DiscountType::Fixed, "50", false),
        ];
        let best = resolve_best_discount(&rows).unwrap();
        assert_eq!(best.discount_value, Decimal::from(10));
        assert_eq!(best.discount_type, DiscountType::Percentage);
    }

    #[test]
    fn fixed_discount_applies_flat_subtraction() {
        let discount = ResolvedDiscount {
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::from(100),
        };
        let amount = Money::from_naira(1000);
        assert_eq!(discount.apply(amount).to_string(), "900.00");
    }

    #[test]
    fn percentage_discount_applies_proportional_subtraction() {
        let discount = ResolvedDiscount {
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
        };
        let amount = Money::from_naira(1000);
        assert_eq!(discount.apply(amount).to_string(), "900.00");
    }
}
