//! Logical providers and credentialed provider accounts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A logical upstream telco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderCode {
    /// MTN Nigeria.
    Mtn,
    /// Globacom.
    Glo,
    /// Airtel Nigeria.
    Airtel,
    /// 9mobile (formerly Etisalat).
    #[serde(rename = "9MOBILE")]
    NineMobile,
    /// Payvantage aggregator.
    Payvantage,
    /// CreditSwitch aggregator.
    Creditswitch,
}

impl ProviderCode {
    /// All known provider codes, in dispatcher-table order.
    pub const ALL: [ProviderCode; 6] = [
        ProviderCode::Mtn,
        ProviderCode::Glo,
        ProviderCode::Airtel,
        ProviderCode::NineMobile,
        ProviderCode::Payvantage,
        ProviderCode::Creditswitch,
    ];

    /// The canonical string form used in configuration and routing tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCode::Mtn => "MTN",
            ProviderCode::Glo => "GLO",
            ProviderCode::Airtel => "AIRTEL",
            ProviderCode::NineMobile => "9MOBILE",
            ProviderCode::Payvantage => "PAYVANTAGE",
            ProviderCode::Creditswitch => "CREDITSWITCH",
        }
    }
}

/// A logical provider (MTN, GLO, AIRTEL, 9MOBILE, PAYVANTAGE, CREDITSWITCH).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Internal identifier.
    pub id: i64,
    /// Logical provider code.
    pub provider_code: ProviderCode,
    /// Display name.
    pub name: String,
}

/// A credentialed account against a provider: the `config` blob carries
/// whatever key/value pairs that provider's adapter needs (login id,
/// public/private keys, base URL, ...), decoded into a strongly typed
/// config struct by the adapter itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    /// Internal identifier.
    pub id: i64,
    /// Owning provider.
    pub provider_id: i64,
    /// Logical provider code, denormalized for dispatch.
    pub provider_code: ProviderCode,
    /// The SIM/identity used as the originating subscriber for providers
    /// that require a registered vending SIM (MTN, AIRTEL, 9MOBILE).
    pub vending_sim: String,
    /// Opaque credential bag, provider-specific.
    pub config: HashMap<String, String>,
}

impl ProviderAccount {
    /// Fetch a config value, or an empty string if absent — mirrors the
    /// original source's `get_config_value(key, default="")` helper.
    pub fn config_value(&self, key: &str) -> &str {
        self.config.get(key).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_mobile_serializes_with_leading_digit() {
        assert_eq!(
            serde_json::to_string(&ProviderCode::NineMobile).unwrap(),
            "\"9MOBILE\""
        );
    }

    #[test]
    fn config_value_defaults_to_empty_string() {
        let account = ProviderAccount {
            id: 1,
            provider_id: 1,
            provider_code: ProviderCode::Mtn,
            vending_sim: "08011111111".into(),
            config: HashMap::new(),
        };
        assert_eq!(account.config_value("username"), "");
    }

    #[test]
    fn all_covers_six_providers() {
        assert_eq!(ProviderCode::ALL.len(), 6);
    }
}
