//! C5 — routes a vend/requery/balance request to the correct provider
//! adapter by `ProviderCode`.
//!
//! Grounded on `original_source/apps/provider/manager.py`'s
//! `ProviderServiceManager`: a flat code-to-implementation table, with
//! an unknown provider code normalized to a "99 not implemented"
//! response rather than an exception, and any adapter-level panic
//! caught and normalized the same way rather than propagated to the
//! caller — mirroring the original's blanket `except Exception`. Each
//! adapter call runs on its own `tokio::spawn`ed task so a panic
//! surfaces as a `JoinError` instead of taking down the coordinator.

use crate::provider::{
    airtel::AirtelAdapter, creditswitch::CreditswitchAdapter, glo::GloAdapter, mtn::MtnAdapter,
    ninemobile::NineMobileAdapter, payvantage::PayvantageAdapter, NormalizedResponse,
    ProviderAdapter, VendRequest,
};
use crate::types::{ProviderAccount, ProviderCode};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one adapter instance per known provider code, built once at
/// startup and shared across every vend/requery call.
pub struct Dispatcher {
    adapters: HashMap<ProviderCode, Arc<dyn ProviderAdapter>>,
}

impl Dispatcher {
    /// Build the dispatcher with the standard six-provider table.
    pub fn new() -> Self {
        let mut adapters: HashMap<ProviderCode, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(ProviderCode::Mtn, Arc::new(MtnAdapter::new()));
        adapters.insert(ProviderCode::Glo, Arc::new(GloAdapter::new()));
        adapters.insert(ProviderCode::Airtel, Arc::new(AirtelAdapter::new()));
        adapters.insert(ProviderCode::NineMobile, Arc::new(NineMobileAdapter::new()));
        adapters.insert(ProviderCode::Payvantage, Arc::new(PayvantageAdapter::new()));
        adapters.insert(ProviderCode::Creditswitch, Arc::new(CreditswitchAdapter::new()));
        Self { adapters }
    }

    /// Vend via the adapter registered for `account.provider_code`. A
    /// provider code with no registered adapter normalizes to "99"
    /// rather than failing the whole request.
    pub async fn vend(&self, account: &ProviderAccount, request: &VendRequest) -> NormalizedResponse {
        let Some(adapter) = self.adapters.get(&account.provider_code).cloned() else {
            tracing::warn!(provider = account.provider_code.as_str(), "no adapter registered for provider code");
            return NormalizedResponse::not_implemented("provider code doesn't match any adapter");
        };

        let account = account.clone();
        let request = request.clone();
        match tokio::spawn(async move { adapter.vend(&account, &request).await }).await {
            Ok(response) => response,
            Err(join_err) => {
                tracing::error!(error = %join_err, "provider adapter task panicked during vend");
                NormalizedResponse::failure(join_err.to_string())
            }
        }
    }

    /// Requery via the adapter registered for `account.provider_code`.
    pub async fn requery(&self, account: &ProviderAccount, provider_ref: &str) -> NormalizedResponse {
        let Some(adapter) = self.adapters.get(&account.provider_code).cloned() else {
            tracing::warn!(provider = account.provider_code.as_str(), "no adapter registered for provider code");
            return NormalizedResponse::not_implemented("provider code doesn't match any adapter");
        };

        let account = account.clone();
        let provider_ref = provider_ref.to_string();
        match tokio::spawn(async move { adapter.requery(&account, &provider_ref).await }).await {
            Ok(response) => response,
            Err(join_err) => {
                tracing::error!(error = %join_err, "provider adapter task panicked during requery");
                NormalizedResponse::failure(join_err.to_string())
            }
        }
    }

    /// Fetch a provider account's balance via its registered adapter.
    pub async fn get_balance(&self, account: &ProviderAccount) -> NormalizedResponse {
        let Some(adapter) = self.adapters.get(&account.provider_code) else {
            return NormalizedResponse::not_implemented("provider code doesn't match any adapter");
        };
        adapter.get_balance(account).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_registers_all_six_providers() {
        let dispatcher = Dispatcher::new();
        for code in ProviderCode::ALL {
            assert!(dispatcher.adapters.contains_key(&code), "missing adapter for {code:?}");
        }
    }
}
