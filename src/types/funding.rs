//! Append-only audit log of merchant balance credits.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a credit to a merchant's balance originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// Credited by an administrator (external CRUD surface; not performed
    /// by this crate, but the source tag is still modeled for audit rows
    /// written by other subsystems).
    Admin,
    /// Credited automatically by the requery worker or timeout sweeper.
    AutoReversal,
    /// Credited manually via an operator-triggered reversal.
    ManualReversal,
}

/// One row per credit ever applied to a merchant's balance. Immutable once
/// written; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantFunding {
    /// Globally unique funding reference.
    pub funding_ref: Uuid,
    /// Merchant credited.
    pub merchant_id: i64,
    /// Amount credited.
    pub amount: Money,
    /// Balance immediately before this credit.
    pub balance_before: Money,
    /// Balance immediately after this credit.
    pub balance_after: Money,
    /// Where the credit originated.
    pub source: FundingSource,
    /// Whether the credit has been approved (always true for entries this
    /// crate writes — approval workflow for admin-sourced credits is out
    /// of scope).
    pub is_approved: bool,
    /// Whether the credit has actually been applied to the balance.
    pub is_credited: bool,
    /// The transaction this refund is associated with, if any.
    pub related_transaction_id: Option<i64>,
    /// When this row was written.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FundingSource::AutoReversal).unwrap(),
            "\"auto_reversal\""
        );
    }
}
