//! Process configuration, loaded once from the environment at startup.
//!
//! Grounded on `src/client.rs`'s `Config`/`Environment` builder shape: a
//! plain struct built by a single fallible constructor, rather than a
//! framework-driven settings object. The teacher builds its `Config`
//! programmatically in caller code; this crate adds the `from_env()`
//! constructor the teacher's own `payrix-webhooks` binary lacked, since
//! this gateway has no equivalent caller wiring it by hand.

use crate::error::{GatewayError, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Gateway-wide configuration, assembled once in `main` and shared via
/// `Arc` with every component that needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string for the ledger/transaction store.
    pub database_url: String,
    /// Redis connection string for the shared cache. When unset, the
    /// gateway falls back to `InMemoryCache` and refuses to start unless
    /// the `standalone` feature is enabled.
    pub redis_url: Option<String>,
    /// HMAC signing key merchants use to sign requests, and this process
    /// uses to sign legacy JWTs.
    pub secret_key: String,
    /// Enables verbose request/response logging; never set in production.
    pub debug: bool,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Upstream HTTP timeout applied to every provider adapter call.
    pub provider_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables, failing fast with
    /// [`GatewayError::Config`] if a required variable is missing or
    /// malformed. Mirrors the teacher's preference for an explicit,
    /// single-shot constructor over a lazily-initialized global.
    pub fn from_env() -> Result<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let redis_url = std::env::var("REDIS_URL").ok();
        let secret_key = require_env("SECRET_KEY")?;
        let debug = std::env::var("DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid BIND_ADDR: {e}")))?;

        let provider_timeout_secs = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        if redis_url.is_none() && !cfg!(feature = "standalone") {
            return Err(GatewayError::Config(
                "REDIS_URL is required unless built with the `standalone` feature".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            secret_key,
            debug,
            bind_addr,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| GatewayError::Config(format!("missing required environment variable: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_var_is_a_config_error() {
        // SAFETY-equivalent: no concurrent env mutation in this test binary.
        std::env::remove_var("DATABASE_URL_TEST_PROBE");
        let err = require_env("DATABASE_URL_TEST_PROBE").unwrap_err();
        assert_eq!(err.code(), "90");
    }
}
