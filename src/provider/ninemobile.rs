//! 9mobile (formerly Etisalat) adapter: SOAP over the EVC Pinless
//! Interface.
//!
//! Grounded on `original_source/apps/provider/services/_etisalat.py`:
//! `EtisalatProviderService`. Amounts are converted to kobo (`amount *
//! 100`) before transmission. `statusCode == "0"` is success;
//! `statusCode == "2"` is invalid MSISDN *unless* the error description
//! mentions "Insufficient Funds" — that specific combination is left as
//! a provider failure rather than misreported as a bad phone number,
//! exactly as the original's guard condition does.

use super::{base_url_or, extract_tag, NormalizedResponse, ProviderAdapter, VendRequest};
use crate::types::ProviderAccount;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;

const DEFAULT_BASE_URL: &str = "https://10.158.8.33:9090/EVC/SinglePointFulfilment/EVCPinlessInterfaceEndpoint";

pub struct NineMobileAdapter {
    client: Client,
}

impl NineMobileAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .danger_accept_invalid_certs(true)
                .timeout(super::DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client with static config never fails to build"),
        }
    }
}

impl Default for NineMobileAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for NineMobileAdapter {
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let recharge_type = if request.data_package_code.is_none() {
            "001"
        } else {
            "991"
        };
        let amount_kobo = (request.amount * rust_decimal::Decimal::from(100))
            .to_i64()
            .unwrap_or(0);

        let payload = format!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:com="http://sdf.cellc.net/commonDataModel">
<soapenv:Header/>
<soapenv:Body>
<SDF_Data xmlns="http://sdf.cellc.net/commonDataModel">
<header>
<processTypeID>7002</processTypeID>
<externalReference>{}</externalReference>
<sourceID>{}</sourceID>
<username>{}</username>
<password>{}</password>
<processFlag>1</processFlag>
</header>
<parameters>
<parameter name="RechargeType">{recharge_type}</parameter>
<parameter name="MSISDN">{}</parameter>
<parameter name="Amount">{amount_kobo}</parameter>
<parameter name="Channel_ID">2ENG0011</parameter>
</parameters>
</SDF_Data>
</soapenv:Body>
</soapenv:Envelope>"#,
            super::generate_sequence(),
            account.vending_sim,
            account.config_value("username"),
            account.config_value("password"),
            request.destination.as_str(),
        );

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", r#"text/xml;charset="utf-8""#)
            .header("SOAPAction", r#""http://sdf.cellc.net/process""#)
            .header("key", account.config_value("auth_key"))
            .header("token", account.config_value("auth_token"))
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => parse_sdf_response(&text),
                Err(err) => NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => {
                NormalizedResponse::pending("request timeout after 10 seconds", None)
            }
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        let payload = format!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:com="http://sdf.cellc.net/commonDataModel">
<soapenv:Body>
<SDF_Data xmlns="http://sdf.cellc.net/commonDataModel">
<header>
<processTypeID>7003</processTypeID>
<externalReference>{provider_ref}</externalReference>
<sourceID>{}</sourceID>
</header>
</SDF_Data>
</soapenv:Body>
</soapenv:Envelope>"#,
            account.vending_sim,
        );

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", r#"text/xml;charset="utf-8""#)
            .header("key", account.config_value("auth_key"))
            .header("token", account.config_value("auth_token"))
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => parse_sdf_response(&text),
                Err(err) => NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => NormalizedResponse::pending("requery timeout", None),
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    async fn get_balance(&self, _account: &ProviderAccount) -> NormalizedResponse {
        NormalizedResponse::not_implemented("9mobile balance lookup not exposed via EVC")
    }
}

fn parse_sdf_response(xml: &str) -> NormalizedResponse {
    let Some(status_code) = extract_tag(xml, "statusCode") else {
        return NormalizedResponse::failure("unparseable 9mobile response: missing statusCode");
    };
    let message = extract_tag(xml, "errorDescription").unwrap_or_else(|| "no message".to_string());
    let provider_ref = extract_tag(xml, "instanceId");

    match status_code.as_str() {
        "0" => NormalizedResponse::success(message, provider_ref),
        "2" if !message.contains("Insufficient Funds") => {
            NormalizedResponse::invalid_msisdn("Invalid MSISDN")
        }
        _ => NormalizedResponse::failure(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_success_status() {
        let resp = parse_sdf_response(
            "<com:result><com:statusCode>0</com:statusCode><com:errorDescription>OK</com:errorDescription><com:instanceId>xyz</com:instanceId></com:result>",
        );
        assert!(resp.is_success());
        assert_eq!(resp.provider_ref.as_deref(), Some("xyz"));
    }

    #[test]
    fn maps_invalid_msisdn_status() {
        let resp = parse_sdf_response(
            "<com:result><com:statusCode>2</com:statusCode><com:errorDescription>Bad number</com:errorDescription></com:result>",
        );
        assert_eq!(resp.code, "08");
    }

    #[test]
    fn insufficient_funds_is_not_reclassified_as_invalid_msisdn() {
        let resp = parse_sdf_response(
            "<com:result><com:statusCode>2</com:statusCode><com:errorDescription>Insufficient Funds</com:errorDescription></com:result>",
        );
        assert_eq!(resp.code, "90");
    }
}
