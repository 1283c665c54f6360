//! Merchant account type and status.

use crate::money::Money;
use crate::types::common::MerchantCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Billing model for a merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum AccountType {
    /// Merchant must have sufficient balance before vending.
    Prepaid = 0,
    /// Merchant is billed after the fact (not modeled by the ledger's
    /// debit-before-dispatch flow; included for schema completeness).
    Postpaid = 1,
}

/// A merchant account: identity, ownership, money, and policy.
///
/// Invariant: `current_balance >= 0` at rest; every mutation records
/// `balance_before` as the value observed immediately prior to the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    /// Internal numeric identifier (row-lock target).
    pub id: i64,
    /// 7-digit unique merchant code.
    pub merchant_code: MerchantCode,
    /// Owning user's identifier. Modeled as a plain id, never an owning
    /// back-pointer to a `User` struct.
    pub user_id: i64,
    /// Balance immediately before the most recent mutation.
    pub balance_before: Money,
    /// Current available balance.
    pub current_balance: Money,
    /// Prepaid or postpaid billing.
    pub account_type: AccountType,
    /// Maximum vends allowed per calendar day (Africa/Lagos local date).
    pub daily_tranx_limit: i32,
    /// Count of vends so far on `today_tranx_date`.
    pub today_tranx_count: i32,
    /// The Lagos-local calendar date `today_tranx_count` applies to.
    pub today_tranx_date: NaiveDate,
    /// API key presented in `X-API-KEY`.
    pub api_key: String,
    /// Shared secret used to compute the HMAC signature.
    pub api_secret: String,
    /// Optional comma-separated IP allowlist.
    pub api_access_ips: Option<String>,
    /// Whether the merchant may authenticate at all.
    pub is_active: bool,
    /// Timestamp of the last balance mutation.
    pub last_updated_balance_at: Option<DateTime<Utc>>,
}

impl Merchant {
    /// Parse the comma-separated IP allowlist, if any.
    pub fn allowed_ips(&self) -> Option<Vec<&str>> {
        self.api_access_ips.as_deref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Merchant {
        Merchant {
            id: 1,
            merchant_code: MerchantCode::new("1234567").unwrap(),
            user_id: 1,
            balance_before: Money::ZERO,
            current_balance: Money::from_naira(500),
            account_type: AccountType::Prepaid,
            daily_tranx_limit: 100,
            today_tranx_count: 0,
            today_tranx_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            api_access_ips: None,
            is_active: true,
            last_updated_balance_at: None,
        }
    }

    #[test]
    fn allowed_ips_none_when_unset() {
        assert!(sample().allowed_ips().is_none());
    }

    #[test]
    fn allowed_ips_splits_and_trims() {
        let mut m = sample();
        m.api_access_ips = Some("10.0.0.1, 10.0.0.2,10.0.0.3".into());
        assert_eq!(
            m.allowed_ips().unwrap(),
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        );
    }

    #[test]
    fn account_type_roundtrips_as_int() {
        let json = serde_json::to_string(&AccountType::Postpaid).unwrap();
        assert_eq!(json, "1");
        let back: AccountType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccountType::Postpaid);
    }

    #[test]
    fn merchant_serializes_camel_case() {
        let m = sample();
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("merchantCode").is_some());
        assert!(json.get("currentBalance").is_some());
        assert!(json.get("dailyTranxLimit").is_some());
    }
}
