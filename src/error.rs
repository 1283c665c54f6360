//! Error types and the normalized response-code taxonomy.
//!
//! Every error that can surface from the vending pipeline is a
//! [`GatewayError`] variant. The HTTP layer is the single place that turns a
//! `GatewayError` into the `{responseCode, responseMessage, responseData}`
//! envelope — nothing upstream of it formats a response body.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Domain-level error, carrying a normalized two-character response code.
///
/// Codes: 00 success, 01 transaction not found, 02 invalid payload, 03 no
/// data found, 04 domain exception, 05 daily limit exceeded, 06
/// processing/duplicate reference, 07 authentication failure, 08 invalid
/// MSISDN, 80 pending at provider, 90 provider/transport failure, 99 not
/// implemented.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request payload failed validation (bad product code, malformed
    /// phone number, non-positive amount, malformed merchant_ref).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The requested product, category, or bundle does not exist.
    #[error("no data found: {0}")]
    NoDataFound(String),

    /// A transaction lookup (requery by merchant_ref) found nothing.
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// A ledger or coordinator invariant was violated by a legitimate
    /// domain condition (e.g. insufficient funds, non-positive amount).
    #[error("domain exception: {0}")]
    Domain(String),

    /// Merchant has exhausted its daily transaction count.
    #[error("daily transaction limit exceeded")]
    DailyLimitExceeded,

    /// `merchant_ref` collided with an existing transaction, or some other
    /// processing error occurred while creating/updating a transaction.
    #[error("processing error: {0}")]
    Processing(String),

    /// Any authentication failure: missing header, unknown merchant,
    /// expired/invalid timestamp, bad signature, disallowed IP.
    #[error("authentication failure: {0}")]
    Authentication(String),

    /// The provider reported the destination MSISDN as invalid.
    #[error("invalid MSISDN")]
    InvalidMsisdn,

    /// The provider accepted the request but has not yet resolved it
    /// (timeout, or an explicit pending status). Never refund on this.
    #[error("pending at provider: {0}")]
    Pending(String),

    /// Transport or provider-side failure not covered by a more specific
    /// variant (HTTP error, unparseable response, provider returned an
    /// unmapped failure code).
    #[error("provider/transport failure: {0}")]
    ProviderFailure(String),

    /// A requested operation is not implemented by this provider.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying HTTP transport error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Underlying JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Underlying XML (de)serialization error.
    #[error("xml error: {0}")]
    Xml(String),

    /// Underlying database error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Underlying cache transport error (never bubbled to callers outside
    /// `cache::*`; cache failures degrade silently to direct lookups).
    #[error("cache error: {0}")]
    Cache(String),
}

impl GatewayError {
    /// The normalized two-character response code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::TransactionNotFound(_) => "01",
            GatewayError::InvalidPayload(_) => "02",
            GatewayError::NoDataFound(_) => "03",
            GatewayError::Domain(_) => "04",
            GatewayError::DailyLimitExceeded => "05",
            GatewayError::Processing(_) => "06",
            GatewayError::Authentication(_) => "07",
            GatewayError::InvalidMsisdn => "08",
            GatewayError::Pending(_) => "80",
            GatewayError::ProviderFailure(_)
            | GatewayError::Http(_)
            | GatewayError::Json(_)
            | GatewayError::Xml(_)
            | GatewayError::Database(_)
            | GatewayError::Cache(_)
            | GatewayError::Config(_) => "90",
            GatewayError::NotImplemented(_) => "99",
        }
    }

    /// Whether the client should retry via requery (not via a fresh vend —
    /// the idempotence key stays the same).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Pending(_)
                | GatewayError::ProviderFailure(_)
                | GatewayError::Http(_)
                | GatewayError::Database(_)
                | GatewayError::Cache(_)
        )
    }

    /// Human-readable message suitable for `responseMessage`.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
