//! C4 — provider adapters: one module per upstream telco, each speaking
//! that telco's own wire protocol (SOAP/XML, bespoke JSON) and normalizing
//! the result to [`NormalizedResponse`].
//!
//! Grounded on `original_source/apps/provider/base.py`'s `BaseProvider`:
//! every adapter owns an HTTP client, a timeout, and a provider account's
//! credential bag, and implements the same three operations
//! (`send_request`, `requery`, `get_balance`). This crate expresses that
//! contract as the [`ProviderAdapter`] trait instead of an abstract base
//! class, and gives every provider a genuine `requery()` — the original
//! stubs all five non-Payvantage providers' requery methods, but nothing
//! about the wire protocol prevents a real implementation, so this
//! crate builds one for each (see `DESIGN.md`, Open Question #6).

pub mod airtel;
pub mod creditswitch;
pub mod glo;
pub mod mtn;
pub mod ninemobile;
pub mod payvantage;

use crate::types::{Msisdn, ProviderAccount};
use async_trait::async_trait;
use std::time::Duration;

/// Shared HTTP timeout for every adapter (mirrors `BaseProvider.timeout`,
/// hardcoded to 10 seconds in the original rather than read from config).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request to vend airtime or a data bundle to a single MSISDN.
#[derive(Debug, Clone)]
pub struct VendRequest {
    pub destination: Msisdn,
    pub amount: rust_decimal::Decimal,
    pub product_code: String,
    /// Data-bundle identifier; `None` for airtime.
    pub data_package_code: Option<String>,
}

/// A provider's response, normalized to the gateway's own response-code
/// taxonomy (`GatewayError::code()` space), independent of whatever
/// status vocabulary the upstream protocol used.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    /// Two-character normalized response code ("00" success, "02"
    /// pending-equivalent handled by `Pending` below takes priority,
    /// "08" invalid MSISDN, "80" pending, "90" failure).
    pub code: &'static str,
    pub message: String,
    /// Upstream's own transaction/reference identifier, if returned.
    pub provider_ref: Option<String>,
}

impl NormalizedResponse {
    pub fn success(message: impl Into<String>, provider_ref: Option<String>) -> Self {
        Self {
            code: "00",
            message: message.into(),
            provider_ref,
        }
    }

    pub fn pending(message: impl Into<String>, provider_ref: Option<String>) -> Self {
        Self {
            code: "80",
            message: message.into(),
            provider_ref,
        }
    }

    pub fn invalid_msisdn(message: impl Into<String>) -> Self {
        Self {
            code: "08",
            message: message.into(),
            provider_ref: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: "90",
            message: message.into(),
            provider_ref: None,
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self {
            code: "99",
            message: message.into(),
            provider_ref: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == "00"
    }

    pub fn is_pending(&self) -> bool {
        self.code == "80"
    }
}

/// The capability every provider adapter implements. Grounded on
/// `BaseProvider`'s `send_request`/`requery`/`get_balance` abstract
/// methods.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Submit a vend request. Never panics or propagates a raw transport
    /// error to the caller — network failures, timeouts, and unparseable
    /// responses are all normalized to [`NormalizedResponse::failure`] or
    /// [`NormalizedResponse::pending`], matching the original's
    /// try/except-around-everything shape.
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse;

    /// Query the upstream for a previously submitted transaction's
    /// current status, keyed by the reference the adapter returned from
    /// `vend` (or the transaction's own merchant_ref, for providers that
    /// accept caller-supplied references).
    async fn requery(
        &self,
        account: &ProviderAccount,
        provider_ref: &str,
    ) -> NormalizedResponse;

    /// Fetch the provider account's available balance, where the
    /// upstream API exposes one.
    async fn get_balance(&self, account: &ProviderAccount) -> NormalizedResponse;
}

/// Base64-encode a string, matching `BaseProvider.encode_base64` (used
/// for HTTP Basic auth headers built from config-supplied credentials).
pub(crate) fn encode_base64(value: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// A random 10-digit sequence number, matching
/// `BaseProvider.generate_sequence`'s `random.randint(1000000000,
/// 9999999999)`.
pub(crate) fn generate_sequence() -> u64 {
    use rand::Rng;
    rand::thread_rng().gen_range(1_000_000_000..=9_999_999_999)
}

/// The account's configured `base_url`, falling back to the adapter's
/// compiled-in upstream when the account doesn't override it. Lets a test
/// point an adapter at a `wiremock` server without touching production
/// provider accounts, which simply never set `base_url`.
pub(crate) fn base_url_or<'a>(account: &'a ProviderAccount, default: &'a str) -> &'a str {
    let configured = account.config_value("base_url");
    if configured.is_empty() {
        default
    } else {
        configured
    }
}

/// Pull the text content of an XML tag out of a raw SOAP/XML response
/// body, tolerating either a namespace-prefixed (`<ns:tag>`) or bare
/// (`<tag>`) opening tag. Shared by the four SOAP/XML provider adapters,
/// none of which need more than this to read the handful of scalar
/// fields their responses carry.
pub(crate) fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let prefixed = format!(":{tag}>");
    let bare = format!("<{tag}>");
    let start = match xml.find(&prefixed) {
        Some(pos) => pos + prefixed.len(),
        None => xml.find(&bare)? + bare.len(),
    };
    let end = xml[start..].find("</")? + start;
    Some(xml[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_tag_reads_namespace_prefixed_value() {
        assert_eq!(
            extract_tag("<a:statusId>0</a:statusId>", "statusId").as_deref(),
            Some("0")
        );
    }

    #[test]
    fn extract_tag_reads_bare_value() {
        assert_eq!(
            extract_tag("<resultCode>0</resultCode>", "resultCode").as_deref(),
            Some("0")
        );
    }

    #[test]
    fn extract_tag_returns_none_when_absent() {
        assert_eq!(extract_tag("<a:statusId>0</a:statusId>", "missing"), None);
    }
}
