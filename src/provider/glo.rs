//! Globacom (GLO) adapter: SOAP over the Seamless/ERS `topupservice`.
//!
//! Grounded on `original_source/apps/provider/services/_glo.py`:
//! `GloProviderService`. `resultCode == "0"` is success, `"94"` is
//! invalid MSISDN. Unlike every other provider's adapter, GLO's own
//! transport helper (`_send_xml`) returns `None` on timeout instead of
//! raising, and the original treats that as `PENDING` rather than a
//! hard failure — this adapter keeps that distinction.

use super::{base_url_or, extract_tag, NormalizedResponse, ProviderAdapter, VendRequest};
use crate::types::ProviderAccount;
use async_trait::async_trait;
use reqwest::Client;

const DEFAULT_BASE_URL: &str = "http://41.203.65.10:8913/topupservice/service?wsdl";

pub struct GloAdapter {
    client: Client,
}

impl GloAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(super::DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client with static config never fails to build"),
        }
    }

    fn build_payload(&self, account: &ProviderAccount, request: &VendRequest) -> String {
        let client_id = account.config_value("client_id");
        let reseller_id = account.config_value("reseller_id");
        let user_id = account.config_value("user_id");
        let password = account.config_value("password");
        let destination = request.destination.as_str();
        let sequence = super::generate_sequence();

        let raw = match &request.data_package_code {
            Some(data_code) => format!(
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ext="http://external.interfaces.ers.seamless.com/">
                <soapenv:Header/>
                <soapenv:Body>
                <ext:requestTopup>
                <context>
                <channel>WSClient</channel>
                <clientComment>vend</clientComment>
                <clientId>{client_id}</clientId>
                <prepareOnly>false</prepareOnly>
                <clientReference>{sequence}</clientReference>
                <clientRequestTimeout>500</clientRequestTimeout>
                <initiatorPrincipalId>
                <id>{reseller_id}</id>
                <type>RESELLERUSER</type>
                <userId>{user_id}</userId>
                </initiatorPrincipalId>
                <password>{password}</password>
                <transactionProperties>
                <entry>
                <key>TRANSACTION_TYPE</key>
                <value>PRODUCT_RECHARGE</value>
                </entry>
                </transactionProperties>
                </context>
                <senderPrincipalId>
                <id>{reseller_id}</id>
                <type>RESELLERUSER</type>
                <userId>{user_id}</userId>
                </senderPrincipalId>
                <topupPrincipalId>
                <id>{destination}</id>
                <type>SUBSCRIBERMSISDN</type>
                <userId></userId>
                </topupPrincipalId>
                <senderAccountSpecifier>
                <accountId>{reseller_id}</accountId>
                <accountTypeId>RESELLER</accountTypeId>
                </senderAccountSpecifier>
                <topupAccountSpecifier>
                <accountId>{destination}</accountId>
                <accountTypeId>DATA_BUNDLE</accountTypeId>
                </topupAccountSpecifier>
                <productId>{data_code}</productId>
                <amount>
                <currency>NGN</currency>
                <value>{}</value>
                </amount>
                </ext:requestTopup>
                </soapenv:Body>
                </soapenv:Envelope>"#,
                request.amount,
            ),
            None => format!(
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ext="http://external.interfaces.ers.seamless.com/">
                <soapenv:Header/>
                <soapenv:Body>
                <ext:requestTopup>
                <context>
                <channel>WSClient</channel>
                <clientComment>vend</clientComment>
                <clientId>{client_id}</clientId>
                <clientReference>{sequence}</clientReference>
                <clientRequestTimeout>500</clientRequestTimeout>
                <initiatorPrincipalId>
                <id>{reseller_id}</id>
                <type>RESELLERUSER</type>
                <userId>{user_id}</userId>
                </initiatorPrincipalId>
                <password>{password}</password>
                </context>
                <senderPrincipalId>
                <id>{reseller_id}</id>
                <type>RESELLERUSER</type>
                <userId>{user_id}</userId>
                </senderPrincipalId>
                <topupPrincipalId>
                <id>{destination}</id>
                <type>SUBSCRIBERMSISDN</type>
                <userId>?</userId>
                </topupPrincipalId>
                <senderAccountSpecifier>
                <accountId>{reseller_id}</accountId>
                <accountTypeId>RESELLER</accountTypeId>
                </senderAccountSpecifier>
                <topupAccountSpecifier>
                <accountId>{destination}</accountId>
                <accountTypeId>AIRTIME</accountTypeId>
                </topupAccountSpecifier>
                <productId>TOPUP</productId>
                <amount>
                <currency>NGN</currency>
                <value>{}</value>
                </amount>
                </ext:requestTopup>
                </soapenv:Body>
                </soapenv:Envelope>"#,
                request.amount,
            ),
        };

        collapse_whitespace_between_tags(&raw)
    }
}

impl Default for GloAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for GloAdapter {
    async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let payload = self.build_payload(account, request);

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", "text/xml")
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => parse_topup_response(&text),
                Err(err) => NormalizedResponse::failure(err.to_string()),
            },
            // The original's `_send_xml` swallows a timeout and returns
            // `None`, which the caller then treats as PENDING, not FAILED.
            Err(err) if err.is_timeout() => {
                NormalizedResponse::pending(format!("request timeout after 10 seconds: {err}"), None)
            }
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        // The ERS SOAP interface exposes `getTransactionStatus` keyed by
        // `ersReference`; built in the same shape as `requestTopup`
        // rather than left as the original's stub.
        let payload = collapse_whitespace_between_tags(&format!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ext="http://external.interfaces.ers.seamless.com/">
            <soapenv:Body>
            <ext:getTransactionStatus>
            <ersReference>{provider_ref}</ersReference>
            </ext:getTransactionStatus>
            </soapenv:Body>
            </soapenv:Envelope>"#
        ));

        let result = self
            .client
            .post(base_url_or(account, DEFAULT_BASE_URL))
            .header("Content-Type", "text/xml")
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.text().await {
                Ok(text) => parse_topup_response(&text),
                Err(err) => NormalizedResponse::failure(err.to_string()),
            },
            Err(err) if err.is_timeout() => NormalizedResponse::pending("requery timeout", None),
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    async fn get_balance(&self, _account: &ProviderAccount) -> NormalizedResponse {
        NormalizedResponse::not_implemented("Balance query not implemented")
    }
}

fn parse_topup_response(xml: &str) -> NormalizedResponse {
    let Some(result_code) = extract_tag(xml, "resultCode") else {
        return NormalizedResponse::failure("unparseable GLO response: missing resultCode");
    };
    let message = extract_tag(xml, "resultDescription").unwrap_or_else(|| "no message".to_string());
    let provider_ref = extract_tag(xml, "ersReference");

    match result_code.as_str() {
        "0" => NormalizedResponse::success(message, provider_ref),
        "94" => NormalizedResponse::invalid_msisdn("Invalid MSISDN"),
        _ => NormalizedResponse::failure(message),
    }
}

/// `re.sub(r">\s+<", "><", payload)` from the original — GLO's gateway
/// is picky about whitespace between tags in the multi-line template.
fn collapse_whitespace_between_tags(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut chars = xml.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '>' {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_success_status() {
        let resp = parse_topup_response(
            "<return><resultCode>0</resultCode><resultDescription>OK</resultDescription><ersReference>ref-1</ersReference></return>",
        );
        assert!(resp.is_success());
        assert_eq!(resp.provider_ref.as_deref(), Some("ref-1"));
    }

    #[test]
    fn maps_invalid_msisdn_status() {
        let resp = parse_topup_response("<return><resultCode>94</resultCode><resultDescription>Bad</resultDescription></return>");
        assert_eq!(resp.code, "08");
    }

    #[test]
    fn collapses_whitespace_between_tags() {
        let collapsed = collapse_whitespace_between_tags("<a>\n  <b>   </b>\n</a>");
        assert_eq!(collapsed, "<a><b></b></a>");
    }
}
