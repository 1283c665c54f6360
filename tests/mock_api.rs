//! Provider adapter tests against `wiremock`-stubbed upstream servers.
//!
//! Every adapter reads its upstream base URL through
//! `ProviderAccount.config_value("base_url")` before falling back to its
//! compiled-in default, so a test account pointed at a `MockServer` never
//! touches the real network. Mirrors the teacher's own `tests/mock_api.rs`,
//! which configures `PayrixClient` against `mock_server.uri()` instead of
//! the real Payrix API.

use rust_decimal::Decimal;
use std::collections::HashMap;
use vas_gateway::provider::creditswitch::CreditswitchAdapter;
use vas_gateway::provider::mtn::MtnAdapter;
use vas_gateway::provider::{ProviderAdapter, VendRequest};
use vas_gateway::types::{Msisdn, ProviderAccount, ProviderCode};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account(provider_code: ProviderCode, base_url: &str, extra: &[(&str, &str)]) -> ProviderAccount {
    let mut config: HashMap<String, String> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    config.insert("base_url".to_string(), base_url.to_string());

    ProviderAccount {
        id: 1,
        provider_id: 1,
        provider_code,
        vending_sim: "08011111111".to_string(),
        config,
    }
}

fn vend_request() -> VendRequest {
    VendRequest {
        destination: Msisdn::normalize("08012345678").unwrap(),
        amount: Decimal::new(10000, 2),
        product_code: "MTNVTU".to_string(),
        data_package_code: None,
    }
}

#[tokio::test]
async fn mtn_vend_success_against_mock_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<SOAP-ENV:Envelope><SOAP-ENV:Body><xsd:vendResponse><xsd:statusId>0</xsd:statusId>\
             <xsd:responseMessage>Transaction successful</xsd:responseMessage>\
             <xsd:txRefId>mtn-ref-1</xsd:txRefId></xsd:vendResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>",
        ))
        .mount(&mock_server)
        .await;

    let account = account(ProviderCode::Mtn, &mock_server.uri(), &[("username", "u"), ("password", "p")]);
    let adapter = MtnAdapter::new();

    let resp = adapter.vend(&account, &vend_request()).await;
    assert!(resp.is_success());
    assert_eq!(resp.provider_ref.as_deref(), Some("mtn-ref-1"));
}

#[tokio::test]
async fn mtn_vend_invalid_msisdn_against_mock_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<SOAP-ENV:Envelope><SOAP-ENV:Body><xsd:vendResponse><xsd:statusId>1004</xsd:statusId>\
             <xsd:responseMessage>Invalid MSISDN</xsd:responseMessage></xsd:vendResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>",
        ))
        .mount(&mock_server)
        .await;

    let account = account(ProviderCode::Mtn, &mock_server.uri(), &[]);
    let adapter = MtnAdapter::new();

    let resp = adapter.vend(&account, &vend_request()).await;
    assert_eq!(resp.code, "08");
}

#[tokio::test]
async fn mtn_vend_upstream_5xx_normalizes_to_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>gateway error</html>"))
        .mount(&mock_server)
        .await;

    let account = account(ProviderCode::Mtn, &mock_server.uri(), &[]);
    let adapter = MtnAdapter::new();

    let resp = adapter.vend(&account, &vend_request()).await;
    assert_eq!(resp.code, "90");
}

#[tokio::test]
async fn creditswitch_vend_success_against_mock_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "responseCode": "00",
            "message": "ok",
            "transactionId": "cs-ref-1",
        })))
        .mount(&mock_server)
        .await;

    let account = account(
        ProviderCode::Creditswitch,
        &mock_server.uri(),
        &[("login_id", "l"), ("public_key", "pub"), ("private_key", "priv")],
    );
    let adapter = CreditswitchAdapter::new();

    let resp = adapter.vend(&account, &vend_request()).await;
    assert!(resp.is_success());
    assert_eq!(resp.provider_ref.as_deref(), Some("cs-ref-1"));
}

#[tokio::test]
async fn creditswitch_vend_c001_response_code_is_pending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseCode": "C001",
        })))
        .mount(&mock_server)
        .await;

    let account = account(
        ProviderCode::Creditswitch,
        &mock_server.uri(),
        &[("login_id", "l"), ("public_key", "pub"), ("private_key", "priv")],
    );
    let adapter = CreditswitchAdapter::new();

    let resp = adapter.vend(&account, &vend_request()).await;
    assert!(resp.is_pending());
}
