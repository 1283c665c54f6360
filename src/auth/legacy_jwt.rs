//! A5 — the legacy `generateMerchantJwtToken` endpoint.
//!
//! Per `DESIGN.md`'s Open Question #2, JWT is not a live authentication
//! mechanism anywhere in this crate — C6's HMAC signature gates every
//! other endpoint. This module only issues tokens for merchants that
//! still call the legacy endpoint; nothing downstream ever accepts one
//! back in.

use crate::error::{GatewayError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issue a JWT for `merchant_code`, valid for `expiration_minutes` from
/// now. The token carries no authority in this crate beyond being handed
/// back to whatever legacy caller requested it.
pub fn generate_merchant_token(
    secret_key: &str,
    merchant_code: &str,
    expiration_minutes: i64,
) -> Result<String> {
    if expiration_minutes <= 0 {
        return Err(GatewayError::InvalidPayload(
            "expiration_minutes must be > 0".to_string(),
        ));
    }

    let now = Utc::now();
    let claims = Claims {
        sub: merchant_code.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::minutes(expiration_minutes)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )
    .map_err(|err| GatewayError::Authentication(format!("token generation failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_decodable_token() {
        let token = generate_merchant_token("test-secret", "1234567", 15).unwrap();
        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(b"test-secret"),
            &jsonwebtoken::Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "1234567");
    }

    #[test]
    fn rejects_non_positive_expiration() {
        assert!(generate_merchant_token("secret", "1234567", 0).is_err());
        assert!(generate_merchant_token("secret", "1234567", -5).is_err());
    }
}
