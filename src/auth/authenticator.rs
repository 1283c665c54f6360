//! C6 — per-request HMAC authentication.
//!
//! Grounded on `crates/payrix/src/webhooks/server.rs`'s `security_middleware`
//! (IP allowlist check, then header check, both against a `ServerState`
//! pulled from axum's `State` extractor). That middleware compares a single
//! shared-secret header; this one generalizes the same shape to a
//! per-merchant HMAC-SHA256 signature plus a replay-window timestamp and an
//! optional per-merchant IP allowlist, as required by spec §4.6.

use crate::cache::{self, Cache};
use crate::error::{GatewayError, Result};
use crate::types::{Envelope, Merchant};
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Replay window: a request's `X-TIMESTAMP` must be within this much of
/// the server's clock, in either direction.
const REPLAY_WINDOW: Duration = Duration::from_secs(300);

/// Shared state the authenticator needs: a way to resolve a merchant
/// (database, behind the cache) and the cache itself for the read-through
/// lookup.
pub struct AuthState {
    pub pool: PgPool,
    pub cache: Arc<dyn Cache>,
}

/// The merchant resolved by a successful authentication, attached to the
/// request's extensions for handlers downstream to pull out.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub merchant: Merchant,
}

/// Axum middleware entry point: authenticate the request or short-circuit
/// with the code-07 envelope.
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers(), addr.ip()).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, "request authentication failed");
            (StatusCode::OK, Json(Envelope::error(&err))).into_response()
        }
    }
}

/// The authentication sequence itself, factored out of the axum plumbing
/// so it can be unit tested without spinning up a router.
///
/// 1. reject if any of the four headers is absent
/// 2. look up the merchant (read-through cache) by `(code, api_key, is_active)`
/// 3. reject if the timestamp is outside the replay window
/// 4. recompute the HMAC signature and compare it in constant time
/// 5. enforce the merchant's IP allowlist, if any
pub async fn authenticate(
    state: &AuthState,
    headers: &HeaderMap,
    remote_addr: IpAddr,
) -> Result<AuthContext> {
    let merchant_code = required_header(headers, "x-merchant-code")?;
    let api_key = required_header(headers, "x-api-key")?;
    let signature = required_header(headers, "x-signature")?;
    let timestamp_raw = required_header(headers, "x-timestamp")?;

    let merchant = resolve_merchant(state, &merchant_code, &api_key).await?;

    let timestamp = parse_timestamp(&timestamp_raw)?;
    let skew = (Utc::now() - timestamp).abs();
    if !within_replay_window(skew.to_std().unwrap_or(Duration::MAX)) {
        return Err(GatewayError::Authentication(format!(
            "timestamp {timestamp_raw} outside the {}s replay window",
            REPLAY_WINDOW.as_secs()
        )));
    }

    verify_signature(&merchant.api_secret, &timestamp_raw, &api_key, &signature)?;

    if let Some(allowed) = merchant.allowed_ips() {
        let client_ip = resolve_client_ip(headers, remote_addr);
        let client_ip_str = client_ip.to_string();
        if !allowed.iter().any(|ip| *ip == client_ip_str) {
            return Err(GatewayError::Authentication(format!(
                "client IP {client_ip} is not in the merchant's allowlist"
            )));
        }
    }

    Ok(AuthContext { merchant })
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Authentication(format!("missing required header {name}")))
}

async fn resolve_merchant(state: &AuthState, code: &str, api_key: &str) -> Result<Merchant> {
    let cache_key = cache::key::merchant_auth(code);

    let cached = cache::read_through(state.cache.as_ref(), &cache_key, cache::ttl::MERCHANT_AUTH, || async {
        let merchant = crate::ledger::find_for_auth(&state.pool, code, api_key).await?;
        Ok(merchant.map(|m| serde_json::to_string(&m).expect("Merchant always serializes")))
    })
    .await?;

    let merchant: Merchant = match cached {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| GatewayError::Authentication(e.to_string()))?,
        None => return Err(GatewayError::Authentication(format!("unknown merchant {code}"))),
    };

    // The cached row might predate an api_key rotation; re-check it rather
    // than trust a stale cache entry blindly.
    if merchant.api_key != api_key || !merchant.is_active {
        return Err(GatewayError::Authentication(format!("unknown merchant {code}")));
    }

    Ok(merchant)
}

/// `true` if `skew` is within the replay window. An exactly-300s-stale
/// timestamp is rejected, not accepted — spec requires `>= REPLAY_WINDOW`
/// to reject, not strict `>`.
fn within_replay_window(skew: Duration) -> bool {
    skew < REPLAY_WINDOW
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Accept a bare "Z"-less UTC timestamp too, per spec's "optional Z".
    let with_z = format!("{raw}Z");
    DateTime::parse_from_rfc3339(&with_z)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| GatewayError::Authentication(format!("unparseable X-TIMESTAMP {raw:?}")))
}

fn verify_signature(api_secret: &str, timestamp: &str, api_key: &str, presented: &str) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(format!("{timestamp}|{api_key}").as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    if constant_time_eq(expected.as_bytes(), presented.as_bytes()) {
        Ok(())
    } else {
        Err(GatewayError::Authentication("signature mismatch".to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Resolve the client's IP: the last hop of `X-Forwarded-For` if present
/// (the entry closest to this server, i.e. the last proxy it traversed),
/// else the TCP peer address.
fn resolve_client_ip(headers: &HeaderMap, remote_addr: IpAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next_back())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
        .unwrap_or(remote_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
    }

    #[test]
    fn constant_time_eq_rejects_mismatched_slices() {
        assert!(!constant_time_eq(b"abc123", b"abc124"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn verify_signature_accepts_correctly_computed_signature() {
        let timestamp = "2026-07-28T12:00:00Z";
        let api_key = "key-1";
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("{timestamp}|{api_key}").as_bytes());
        let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(verify_signature("secret", timestamp, api_key, &sig).is_ok());
    }

    #[test]
    fn verify_signature_rejects_wrong_secret() {
        let timestamp = "2026-07-28T12:00:00Z";
        let api_key = "key-1";
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("{timestamp}|{api_key}").as_bytes());
        let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(verify_signature("wrong-secret", timestamp, api_key, &sig).is_err());
    }

    #[test]
    fn within_replay_window_accepts_299_seconds() {
        assert!(within_replay_window(Duration::from_secs(299)));
    }

    #[test]
    fn within_replay_window_rejects_exactly_300_seconds() {
        assert!(!within_replay_window(Duration::from_secs(300)));
    }

    #[test]
    fn parse_timestamp_accepts_explicit_z() {
        assert!(parse_timestamp("2026-07-28T12:00:00Z").is_ok());
    }

    #[test]
    fn parse_timestamp_accepts_missing_z() {
        assert!(parse_timestamp("2026-07-28T12:00:00+00:00").is_ok());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("not-a-timestamp").is_err());
    }

    #[test]
    fn resolve_client_ip_prefers_last_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2, 10.0.0.3".parse().unwrap());
        let resolved = resolve_client_ip(&headers, "127.0.0.1".parse().unwrap());
        assert_eq!(resolved, "10.0.0.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn resolve_client_ip_falls_back_to_remote_addr() {
        let headers = HeaderMap::new();
        let resolved = resolve_client_ip(&headers, "192.168.1.5".parse().unwrap());
        assert_eq!(resolved, "192.168.1.5".parse::<IpAddr>().unwrap());
    }
}
