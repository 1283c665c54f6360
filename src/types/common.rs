//! Validated newtypes and the HTTP response envelope shared across modules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A merchant's unique 7-digit identifier.
///
/// Assignment (random generation with retry-until-unique) is an external
/// seeding concern; this type only validates the shape of codes already
/// assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerchantCode(String);

impl MerchantCode {
    /// Validate and wrap a merchant code. Must be exactly 7 ASCII digits.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.len() != 7 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "merchant code must be exactly 7 digits, got {value:?}"
            ));
        }
        Ok(Self(value))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MerchantCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MerchantCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        MerchantCode::new(raw).map_err(serde::de::Error::custom)
    }
}

/// The caller-supplied idempotence key for a vend attempt.
///
/// Must match `^[A-Za-z0-9-]+$` per the coordinator's validation step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerchantRef(String);

impl MerchantRef {
    /// Validate and wrap a merchant reference.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("merchant_ref must not be empty".to_string());
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(format!(
                "merchant_ref must match ^[A-Za-z0-9-]+$, got {value:?}"
            ));
        }
        Ok(Self(value))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MerchantRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MerchantRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        MerchantRef::new(raw).map_err(serde::de::Error::custom)
    }
}

/// A normalized Nigerian MSISDN: digits only, leading `0`.
///
/// Mirrors the original source's `format_msisdn` helper — `+234` and `234`
/// prefixes are rewritten to a leading `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Msisdn(String);

impl Msisdn {
    /// Normalize and validate a phone number.
    ///
    /// `+2348012345678`, `2348012345678`, and `08012345678` all normalize to
    /// `08012345678`.
    pub fn normalize(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        let normalized = if let Some(rest) = digits.strip_prefix("234") {
            format!("0{rest}")
        } else {
            digits
        };
        if normalized.len() != 11 || !normalized.starts_with('0') {
            return Err(format!("invalid MSISDN: {raw:?}"));
        }
        Ok(Self(normalized))
    }

    /// Borrow the normalized digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The standard HTTP response envelope: `{responseCode, responseMessage,
/// responseData}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Two-character normalized response code.
    pub response_code: &'static str,
    /// Human-readable message.
    pub response_message: String,
    /// Payload, present on success and on some partial-failure responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<T>,
}

impl<T> Envelope<T> {
    /// Build a success envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Envelope {
            response_code: "00",
            response_message: message.into(),
            response_data: Some(data),
        }
    }

    /// Build an envelope with an explicit response code — for outcomes
    /// that aren't a plain success/failure split, like a `PENDING`
    /// dispatch (code 80) that still carries a transaction payload.
    pub fn with_code(code: &'static str, message: impl Into<String>, data: Option<T>) -> Self {
        Envelope {
            response_code: code,
            response_message: message.into(),
            response_data: data,
        }
    }

    /// Build an error envelope carrying no payload, generic over whatever
    /// `T` the call site's success branch uses — unlike
    /// [`Envelope::<()>::error`], which fixes `T = ()`.
    pub fn from_error(err: &crate::error::GatewayError) -> Self {
        Envelope {
            response_code: err.code(),
            response_message: err.message(),
            response_data: None,
        }
    }
}

impl Envelope<()> {
    /// Build an error envelope from a [`crate::error::GatewayError`].
    pub fn error(err: &crate::error::GatewayError) -> Self {
        Envelope {
            response_code: err.code(),
            response_message: err.message(),
            response_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merchant_code_accepts_seven_digits() {
        assert!(MerchantCode::new("1234567").is_ok());
    }

    #[test]
    fn merchant_code_rejects_wrong_length() {
        assert!(MerchantCode::new("123456").is_err());
        assert!(MerchantCode::new("12345678").is_err());
    }

    #[test]
    fn merchant_code_rejects_non_digits() {
        assert!(MerchantCode::new("12345ab").is_err());
    }

    #[test]
    fn merchant_ref_accepts_alphanumeric_and_dash() {
        assert!(MerchantRef::new("ABC-1234").is_ok());
    }

    #[test]
    fn merchant_ref_rejects_other_punctuation() {
        assert!(MerchantRef::new("ABC_1234").is_err());
        assert!(MerchantRef::new("ABC.1234").is_err());
        assert!(MerchantRef::new("").is_err());
    }

    #[test]
    fn msisdn_normalizes_plus_234_prefix() {
        let m = Msisdn::normalize("+2348012345678").unwrap();
        assert_eq!(m.as_str(), "08012345678");
    }

    #[test]
    fn msisdn_normalizes_bare_234_prefix() {
        let m = Msisdn::normalize("2348012345678").unwrap();
        assert_eq!(m.as_str(), "08012345678");
    }

    #[test]
    fn msisdn_accepts_already_normalized() {
        let m = Msisdn::normalize("08012345678").unwrap();
        assert_eq!(m.as_str(), "08012345678");
    }

    #[test]
    fn msisdn_rejects_wrong_length() {
        assert!(Msisdn::normalize("0801234567").is_err());
        assert!(Msisdn::normalize("080123456789").is_err());
    }
}
