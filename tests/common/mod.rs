//! Shared test infrastructure for integration tests.
//!
//! Mirrors the teacher's `tests/common/mod.rs`: a `connect()` helper gated
//! on an environment variable, plus small stateless helpers tests reach
//! for repeatedly. Integration tests here assume a database already
//! migrated with this crate's schema and seeded with fixture rows (a
//! merchant, a product, a provider account) — the same posture the
//! teacher's own `TestContext::new()` takes toward its Payrix sandbox
//! account, assuming resources exist rather than provisioning them.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "vas_gateway=debug");
        }
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Connect to the integration test database. Panics with a clear message
/// if `TEST_DATABASE_URL` isn't set — callers should gate on it with
/// `#[ignore]`, matching the teacher's `PAYRIX_API_KEY`-gated tests.
pub async fn connect() -> PgPool {
    let url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set to run this test");
    PgPool::connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL")
}

/// Compute the `X-SIGNATURE` header value the same way
/// `auth::authenticator::verify_signature` recomputes it server-side:
/// HMAC-SHA256 over `{timestamp}|{api_key}` under the merchant's
/// `api_secret`, base64-encoded.
pub fn sign_request(api_secret: &str, timestamp: &str, api_key: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}|{api_key}").as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
