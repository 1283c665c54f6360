//! CreditSwitch adapter: JSON REST with a SHA-256 request checksum.
//!
//! Grounded on `original_source/apps/provider/services/_creditswitch.py`:
//! `CreditswitchProviderService`. The spec's prose calls this a
//! "bcrypt-hashed base64 checksum," but the original computes a plain
//! SHA-256 hex digest over the concatenated payload fields plus the
//! account's private key — bcrypt's salted, randomized output could
//! never reproduce a checksum the receiver can independently verify, so
//! SHA-256 hex is what this adapter implements (see `DESIGN.md`, Open
//! Question #5).
//!
//! Checksum field order: `loginId + key + requestId [+ serviceId] +
//! amount + recipient + date [+ productId] + private_key`.
//!
//! Like Payvantage, the original's `status`/`responseCode` mapping
//! reuses gateway response codes inconsistently with their meaning
//! elsewhere in this crate; this adapter maps straight into
//! [`NormalizedResponse`]'s own taxonomy instead. `responseCode` `"00"`
//! is success; `"C001"` and `"C04"` are both pending (in-flight at the
//! upstream, matching `status == "pending"`); everything else is a
//! failure.

use super::{NormalizedResponse, ProviderAdapter, VendRequest};
use crate::types::ProviderAccount;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub struct CreditswitchAdapter {
    client: Client,
}

impl CreditswitchAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(super::DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client with static config never fails to build"),
        }
    }

    fn service_id(product_code: &str) -> &'static str {
        let is_data = product_code.contains("DATA");
        if product_code.contains("MTN") {
            if is_data { "D04D" } else { "A04E" }
        } else if product_code.contains("GLO") {
            if is_data { "D04G" } else { "A04G" }
        } else if product_code.contains("AIRTEL") {
            if is_data { "D04A" } else { "A04A" }
        } else if product_code.contains("9MOBILE") {
            if is_data { "D04N" } else { "A04N" }
        } else {
            "A04E"
        }
    }
}

impl Default for CreditswitchAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for CreditswitchAdapter {
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let login_id = account.config_value("login_id");
        let public_key = account.config_value("public_key");
        let private_key = account.config_value("private_key");
        let base_url = account.config_value("base_url");

        let request_id = (rand::random::<u64>() % 900_000_000_000 + 100_000_000_000).to_string();
        let date = Utc::now().to_rfc3339();
        let service_id = Self::service_id(&request.product_code);

        let mut checksum_input = format!("{login_id}{public_key}{request_id}{service_id}{}{}{date}",
            request.amount, request.destination.as_str());
        if let Some(product_id) = &request.data_package_code {
            checksum_input.push_str(product_id);
        }
        checksum_input.push_str(private_key);
        let checksum = format!("{:x}", Sha256::digest(checksum_input.as_bytes()));

        let payload = CreditswitchRequest {
            login_id: login_id.to_string(),
            key: public_key.to_string(),
            request_id: request_id.clone(),
            service_id: service_id.to_string(),
            amount: request.amount,
            recipient: request.destination.as_str().to_string(),
            date,
            product_id: request.data_package_code.clone(),
            checksum,
        };

        let path = if request.data_package_code.is_some() {
            "/api/v1/dvend"
        } else {
            "/api/v1/mvend"
        };

        let result = self
            .client
            .post(format!("{base_url}{path}"))
            .json(&payload)
            .send()
            .await;

        let body: CreditswitchResponse = match result {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(err) => return NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                return NormalizedResponse::pending("request timeout after 10 seconds", None)
            }
            Err(err) => return NormalizedResponse::failure(err.to_string()),
        };

        normalize(&body, &request_id)
    }

    async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        let base_url = account.config_value("base_url");
        let login_id = account.config_value("login_id");
        let public_key = account.config_value("public_key");

        let result = self
            .client
            .post(format!("{base_url}/api/v1/status"))
            .json(&serde_json::json!({
                "loginId": login_id,
                "key": public_key,
                "transactionId": provider_ref,
            }))
            .send()
            .await;

        let body: CreditswitchResponse = match result {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(err) => return NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                return NormalizedResponse::pending("requery timeout", None)
            }
            Err(err) => return NormalizedResponse::failure(err.to_string()),
        };

        normalize(&body, provider_ref)
    }

    async fn get_balance(&self, _account: &ProviderAccount) -> NormalizedResponse {
        NormalizedResponse::not_implemented("CreditSwitch balance lookup not exposed")
    }
}

#[derive(Debug, Serialize)]
struct CreditswitchRequest {
    #[serde(rename = "loginId")]
    login_id: String,
    key: String,
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "serviceId")]
    service_id: String,
    amount: rust_decimal::Decimal,
    recipient: String,
    date: String,
    #[serde(rename = "productId", skip_serializing_if = "Option::is_none")]
    product_id: Option<String>,
    checksum: String,
}

#[derive(Debug, Deserialize)]
struct CreditswitchResponse {
    status: Option<String>,
    #[serde(rename = "responseCode")]
    response_code: Option<String>,
    message: Option<String>,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
}

fn normalize(body: &CreditswitchResponse, request_id: &str) -> NormalizedResponse {
    let provider_ref = body
        .transaction_id
        .clone()
        .unwrap_or_else(|| request_id.to_string());

    let is_success = body.status.as_deref() == Some("success")
        || body.response_code.as_deref() == Some("00");
    let is_pending = body.status.as_deref() == Some("pending")
        || matches!(body.response_code.as_deref(), Some("C001") | Some("C04"));

    if is_success {
        NormalizedResponse::success("successful", Some(provider_ref))
    } else if is_pending {
        NormalizedResponse::pending("transaction pending", Some(provider_ref))
    } else {
        NormalizedResponse::failure(
            body.message
                .clone()
                .unwrap_or_else(|| "transaction failed".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_id_maps_mtn_data() {
        assert_eq!(CreditswitchAdapter::service_id("MTNDATA"), "D04D");
        assert_eq!(CreditswitchAdapter::service_id("MTNVTU"), "A04E");
    }

    #[test]
    fn service_id_defaults_to_mtn_airtime() {
        assert_eq!(CreditswitchAdapter::service_id("UNKNOWN"), "A04E");
    }

    #[test]
    fn maps_success_status() {
        let resp = normalize(
            &CreditswitchResponse {
                status: Some("success".into()),
                response_code: None,
                message: None,
                transaction_id: Some("tx-1".into()),
            },
            "fallback",
        );
        assert!(resp.is_success());
        assert_eq!(resp.provider_ref.as_deref(), Some("tx-1"));
    }

    #[test]
    fn maps_pending_status() {
        let resp = normalize(
            &CreditswitchResponse {
                status: Some("pending".into()),
                response_code: None,
                message: None,
                transaction_id: None,
            },
            "fallback-ref",
        );
        assert!(resp.is_pending());
    }

    #[test]
    fn maps_c001_and_c04_response_codes_as_pending() {
        for code in ["C001", "C04"] {
            let resp = normalize(
                &CreditswitchResponse {
                    status: None,
                    response_code: Some(code.to_string()),
                    message: None,
                    transaction_id: None,
                },
                "fallback-ref",
            );
            assert!(resp.is_pending(), "responseCode {code} should map to pending");
        }
    }

    #[test]
    fn checksum_order_matches_original_field_concatenation() {
        // loginId + key + requestId + serviceId + amount + recipient + date [+ productId] + privateKey
        let input = format!("{}{}{}{}{}{}{}{}", "L", "K", "R", "S", "100", "0801", "2024", "P");
        let checksum = format!("{:x}", Sha256::digest(input.as_bytes()));
        assert_eq!(checksum.len(), 64);
    }
}
