//! MTN Nigeria adapter: SOAP/XML over `ershostif.mtn.ng`.
//!
//! Grounded on `original_source/apps/provider/services/_mtn.py`:
//! `MTNNProviderService`. Request is a hand-built SOAP envelope (the
//! original interpolates XML as a raw string rather than using a
//! templating library — this crate keeps that literal-template shape
//! but builds it with `format!` instead of Python f-strings); the
//! response is read back with [`super::extract_tag`] rather than
//! `xmltodict`'s full parse, since only three scalar fields are ever
//! read out of it.
//!
//! Status mapping: `statusId == "0"` -> success; `statusId` in
//! `{"1004", "202"}` -> invalid MSISDN; anything else falls through with
//! the upstream's own `statusId`/`responseMessage` surfaced as a
//! failure. Transport timeout -> pending (code 80), matching the
//! original's belief that a timed-out vend may still complete upstream.

use super::{
    base_url_or, encode_base64, extract_tag, generate_sequence, NormalizedResponse, ProviderAdapter,
    VendRequest,
};
use crate::types::ProviderAccount;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://ershostif.mtn.ng/axis2/services/HostIFService";

pub struct MtnAdapter {
    client: Client,
}

impl MtnAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(super::DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client with static config never fails to build"),
        }
    }

    fn auth_header(&self, account: &ProviderAccount) -> String {
        let username = account.config_value("username");
        let password = account.config_value("password");
        format!("Basic {}", encode_base64(&format!("{username}:{password}")))
    }
}

impl Default for MtnAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MtnAdapter {
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let payload = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://hostif.vtm.prism.co.za/xsd"><soapenv:Header/><soapenv:Body><xsd:vend><xsd:origMsisdn>{}</xsd:origMsisdn><xsd:destMsisdn>{}</xsd:destMsisdn><xsd:amount>{}</xsd:amount><xsd:sequence>{}</xsd:sequence><xsd:tariffTypeId>1</xsd:tariffTypeId><xsd:serviceproviderId>1</xsd:serviceproviderId></xsd:vend></soapenv:Body></soapenv:Envelope>"#,
            account.vending_sim,
            request.destination.as_str(),
            request.amount,
            generate_sequence(),
        );

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", "application/xml")
            .header("SoapAction", "urn:queryTx")
            .header("Authorization", self.auth_header(account))
            .body(payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        let body = match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => text,
                Err(err) => return NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                return NormalizedResponse::pending("request timeout after 10 seconds", None)
            }
            Err(err) => return NormalizedResponse::failure(err.to_string()),
        };

        parse_vend_response(&body)
    }

    async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        // MTN's HostIF interface exposes a query operation over the same
        // SOAP endpoint, keyed by the original txRefId.
        let payload = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://hostif.vtm.prism.co.za/xsd"><soapenv:Header/><soapenv:Body><xsd:queryTx><xsd:origMsisdn>{}</xsd:origMsisdn><xsd:txRefId>{}</xsd:txRefId></xsd:queryTx></soapenv:Body></soapenv:Envelope>"#,
            account.vending_sim, provider_ref,
        );

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", "application/xml")
            .header("SoapAction", "urn:queryTx")
            .header("Authorization", self.auth_header(account))
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => parse_vend_response(&text),
                Err(err) => NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                NormalizedResponse::pending("requery timeout", None)
            }
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    async fn get_balance(&self, _account: &ProviderAccount) -> NormalizedResponse {
        NormalizedResponse::not_implemented("MTN balance lookup not exposed via HostIF")
    }
}

fn parse_vend_response(xml: &str) -> NormalizedResponse {
    let Some(status_id) = extract_tag(xml, "statusId") else {
        return NormalizedResponse::failure("unparseable MTN response: missing statusId");
    };
    let message = extract_tag(xml, "responseMessage").unwrap_or_else(|| "no message".to_string());
    let provider_ref = extract_tag(xml, "txRefId");

    match status_id.as_str() {
        "0" => NormalizedResponse::success(message, provider_ref),
        "1004" | "202" => NormalizedResponse::invalid_msisdn("Invalid MSISDN"),
        _ => NormalizedResponse::failure(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_success_status() {
        let resp = parse_vend_response(
            "<SOAP-ENV:Envelope><SOAP-ENV:Body><xsd:vendResponse><xsd:statusId>0</xsd:statusId><xsd:responseMessage>OK</xsd:responseMessage><xsd:txRefId>abc</xsd:txRefId></xsd:vendResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>",
        );
        assert!(resp.is_success());
        assert_eq!(resp.provider_ref.as_deref(), Some("abc"));
    }

    #[test]
    fn maps_invalid_phone_status() {
        let resp = parse_vend_response(
            "<xsd:vendResponse><xsd:statusId>1004</xsd:statusId><xsd:responseMessage>Bad</xsd:responseMessage></xsd:vendResponse>",
        );
        assert_eq!(resp.code, "08");
    }

    #[test]
    fn maps_unrecognized_status_to_failure() {
        let resp = parse_vend_response(
            "<xsd:vendResponse><xsd:statusId>42</xsd:statusId><xsd:responseMessage>Unknown</xsd:responseMessage></xsd:vendResponse>",
        );
        assert_eq!(resp.code, "90");
    }
}
