//! Transaction state machine and record.

use crate::money::Money;
use crate::types::common::{MerchantRef, Msisdn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction lifecycle status.
///
/// State machine: `Pending -> Processing -> (Success | Failed)`, or
/// `Pending -> (Success | Failed)` directly. No transition out of `Success`
/// or `Failed`. `is_reverse` may only be set when transitioning to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TransactionStatus {
    /// Debited and inserted, dispatch not yet attempted or in flight.
    Pending,
    /// Provider accepted but has not resolved the request; a requery has
    /// been scheduled.
    Processing,
    /// Terminal: provider confirmed the vend.
    Success,
    /// Terminal: provider rejected, timed out past the sweeper window, or
    /// the dispatcher could not route the request. Always paired with
    /// `is_reverse = true` and a `reversed_at`.
    Failed,
}

impl TransactionStatus {
    /// `true` for `Success` or `Failed` — no further transition is valid.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

/// A single vend attempt, keyed globally by `merchant_ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Internal numeric identifier (row-lock target).
    pub id: i64,
    /// Caller-supplied idempotence key. Globally unique.
    pub merchant_ref: MerchantRef,
    /// Owning merchant.
    pub merchant_id: i64,
    /// Requested amount before discount.
    pub amount: Money,
    /// Amount deducted from `amount` due to an active discount.
    pub discount_amount: Money,
    /// Merchant balance immediately before this transaction's debit.
    pub balance_before: Money,
    /// Merchant balance immediately after this transaction's debit.
    /// Invariant: `balance_after + discount_amount == balance_before`.
    pub balance_after: Money,
    /// Destination phone number.
    pub beneficiary_account: Msisdn,
    /// Product being vended.
    pub product_code: String,
    /// `AIRTIME` or `DATA`.
    pub product_category: String,
    /// The provider account the order was routed to.
    pub provider_account_id: i64,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Upstream's own transaction identifier, once known.
    pub provider_ref: Option<String>,
    /// Upstream's last status message, for diagnostics.
    pub provider_desc: Option<String>,
    /// Whether a refund credit was issued for this transaction.
    /// Invariant: a refund `MerchantFunding` row exists iff this is `true`.
    pub is_reverse: bool,
    /// When the refund (if any) was issued.
    pub reversed_at: Option<DateTime<Utc>>,
    /// Creation timestamp, used by the timeout sweeper's age predicate.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// `true` if transitioning this transaction to `Failed` right now would
    /// satisfy the refund invariant (not already reversed).
    pub fn needs_refund_on_failure(&self) -> bool {
        !self.is_reverse
    }
}

/// Fields the transaction store permits updating after creation. Everything
/// else is immutable once a row is inserted.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    /// New lifecycle status, if changing.
    pub status: Option<TransactionStatus>,
    /// New provider reference, if learned.
    pub provider_ref: Option<String>,
    /// New provider description, if learned.
    pub provider_desc: Option<String>,
    /// Set when a refund is issued.
    pub is_reverse: Option<bool>,
    /// Set alongside `is_reverse`.
    pub reversed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
    }

    #[test]
    fn status_serializes_as_pascal_case() {
        let json = serde_json::to_string(&TransactionStatus::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
    }

    #[test]
    fn needs_refund_on_failure_respects_existing_reversal() {
        let txn = Transaction {
            id: 1,
            merchant_ref: MerchantRef::new("ABC-1").unwrap(),
            merchant_id: 1,
            amount: Money::from_naira(100),
            discount_amount: Money::from_naira(100),
            balance_before: Money::from_naira(500),
            balance_after: Money::from_naira(400),
            beneficiary_account: Msisdn::normalize("08012345678").unwrap(),
            product_code: "MTNVTU".into(),
            product_category: "AIRTIME".into(),
            provider_account_id: 1,
            status: TransactionStatus::Processing,
            provider_ref: None,
            provider_desc: None,
            is_reverse: false,
            reversed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(txn.needs_refund_on_failure());

        let mut reversed = txn;
        reversed.is_reverse = true;
        assert!(!reversed.needs_refund_on_failure());
    }
}
