//! Payvantage adapter: JSON REST, covering both airtime and data vends
//! and a genuinely implemented requery.
//!
//! Grounded on `original_source/apps/provider/services/_payvantage.py`:
//! `PayvantageProviderService`. Airtime vs data routing is decided by
//! the request's `data_package_code` rather than substring-matching the
//! product code string, since this crate's `VendRequest` already
//! carries that distinction structurally.
//!
//! The original's `_process_response` reuses the *gateway's own*
//! response-code alphabet inconsistently with the meanings those codes
//! carry elsewhere in this crate ("01" there means "transaction
//! failed", but "01" means "transaction not found" everywhere else in
//! this gateway's taxonomy). This adapter maps Payvantage's
//! `status_code` straight into [`NormalizedResponse`]'s own taxonomy
//! instead of reproducing that collision: `"200"` success, `"300"`
//! duplicate-at-provider (failure), `"500"` failure, `"501"` pending,
//! `"3"` invalid MSISDN, anything else failure.

use super::{NormalizedResponse, ProviderAdapter, VendRequest};
use crate::types::ProviderAccount;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub struct PayvantageAdapter {
    client: Client,
}

impl PayvantageAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(super::DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client with static config never fails to build"),
        }
    }

    fn network_for(product_code: &str) -> &'static str {
        if product_code.contains("MTN") {
            "MTN"
        } else if product_code.contains("GLO") {
            "GLO"
        } else if product_code.contains("AIRTEL") {
            "AIRTEL"
        } else if product_code.contains("9MOBILE") {
            "9Mobile"
        } else {
            "MTN"
        }
    }
}

impl Default for PayvantageAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for PayvantageAdapter {
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let base_url = account.config_value("base_url");
        let transaction_id = format!(
            "{}-{}",
            rand::random::<u32>() % 90_000 + 10_000,
            super::generate_sequence()
        );

        let (path, payload) = match &request.data_package_code {
            Some(plan_code) => (
                "/service/api/single_data_direct_vending",
                json!({
                    "plan_code": plan_code,
                    "phonenumber": request.destination.as_str(),
                    "transaction_id": transaction_id,
                }),
            ),
            None => (
                "/service/api/single_airtime_direct_vending",
                json!({
                    "amount": request.amount.to_string(),
                    "network": Self::network_for(&request.product_code),
                    "phonenumber": request.destination.as_str(),
                    "transaction_id": transaction_id,
                }),
            ),
        };

        let result = self
            .client
            .post(format!("{base_url}{path}"))
            .header("x-api-key", account.config_value("api_key"))
            .header("client-id", account.config_value("client_id"))
            .json(&payload)
            .send()
            .await;

        let body: PayvantageResponse = match result {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(err) => return NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                return NormalizedResponse::pending("request timeout after 10 seconds", None)
            }
            Err(err) => return NormalizedResponse::failure(err.to_string()),
        };

        normalize(&body, &transaction_id)
    }

    async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        let base_url = account.config_value("base_url");

        let result = self
            .client
            .post(format!("{base_url}/check_transaction_status"))
            .header("x-api-key", account.config_value("api_key"))
            .header("client-id", account.config_value("client_id"))
            .json(&json!({ "transaction_id": provider_ref }))
            .send()
            .await;

        let body: PayvantageRequeryResponse = match result {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(err) => return NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                return NormalizedResponse::pending("requery timeout", None)
            }
            Err(err) => return NormalizedResponse::failure(err.to_string()),
        };

        match body.result.and_then(|r| r.status_code) {
            Some(code) if code == "200" => {
                NormalizedResponse::success("successful", Some(provider_ref.to_string()))
            }
            _ => NormalizedResponse::failure(
                body.message.unwrap_or_else(|| "transaction not found".to_string()),
            ),
        }
    }

    async fn get_balance(&self, _account: &ProviderAccount) -> NormalizedResponse {
        NormalizedResponse::not_implemented("Payvantage balance lookup not exposed")
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct PayvantageResponse {
    status_code: Option<String>,
    message: Option<String>,
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PayvantageRequeryResponse {
    status_code: Option<String>,
    message: Option<String>,
    result: Option<PayvantageRequeryResult>,
}

#[derive(Debug, Deserialize)]
struct PayvantageRequeryResult {
    status_code: Option<String>,
}

fn normalize(body: &PayvantageResponse, transaction_id: &str) -> NormalizedResponse {
    let provider_ref = body
        .reference
        .clone()
        .unwrap_or_else(|| transaction_id.to_string());

    match body.status_code.as_deref() {
        Some("200") => NormalizedResponse::success("successful", Some(provider_ref)),
        Some("3") => NormalizedResponse::invalid_msisdn("Invalid request"),
        Some("501") => NormalizedResponse::pending("transaction pending", Some(provider_ref)),
        Some("300") => NormalizedResponse::failure("duplicate transaction"),
        Some("500") => NormalizedResponse::failure("transaction failed"),
        _ => NormalizedResponse::failure(
            body.message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_success_status() {
        let resp = normalize(
            &PayvantageResponse {
                status_code: Some("200".into()),
                message: None,
                reference: Some("ref-1".into()),
            },
            "fallback",
        );
        assert!(resp.is_success());
        assert_eq!(resp.provider_ref.as_deref(), Some("ref-1"));
    }

    #[test]
    fn maps_pending_status() {
        let resp = normalize(
            &PayvantageResponse {
                status_code: Some("501".into()),
                message: None,
                reference: None,
            },
            "fallback-ref",
        );
        assert!(resp.is_pending());
        assert_eq!(resp.provider_ref.as_deref(), Some("fallback-ref"));
    }

    #[test]
    fn maps_invalid_request_status() {
        let resp = normalize(
            &PayvantageResponse {
                status_code: Some("3".into()),
                message: None,
                reference: None,
            },
            "x",
        );
        assert_eq!(resp.code, "08");
    }

    #[test]
    fn network_for_defaults_to_mtn() {
        assert_eq!(PayvantageAdapter::network_for("UNKNOWNVTU"), "MTN");
        assert_eq!(PayvantageAdapter::network_for("GLODATA"), "GLO");
    }
}
