//! A3 — the HTTP surface: the axum [`Router`] wiring spec §6's endpoints,
//! the shared [`AppState`], and the single envelope-conversion point every
//! handler in [`handlers`] funnels through.
//!
//! Grounded on `crates/payrix/src/webhooks/server.rs`'s `WebhookServer`:
//! a state struct built once, a router assembled from it, `run`/
//! `run_with_shutdown` wrapping `axum::serve`, and `ConnectInfo<SocketAddr>`
//! threaded through via `into_make_service_with_connect_info`.

pub mod handlers;

use crate::auth::{self, AuthState};
use crate::cache::Cache;
use crate::coordinator::Coordinator;
use crate::workers::TimeoutSweeper;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;

/// Everything a handler needs: the pool and cache are exposed directly for
/// the read-only listing endpoints, while the vend/requery endpoints go
/// through [`Coordinator`] instead of touching the pool themselves.
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<dyn Cache>,
    pub coordinator: Arc<Coordinator>,
    pub auth: Arc<AuthState>,
    pub sweeper: Arc<TimeoutSweeper>,
    pub secret_key: String,
}

/// Build the full router: public routes (health, legacy JWT issuance, the
/// cron trigger) plus the merchant-authenticated product routes, gated by
/// [`auth::require_auth`] as a second, independently-stated middleware
/// layer — the same shape as the teacher's `security_middleware`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/product/vendAirtime", post(handlers::vend_airtime))
        .route("/api/product/vendData", post(handlers::vend_data))
        .route("/api/product/requeryTransaction", post(handlers::requery_transaction))
        .route("/api/product/getProductCategories", get(handlers::get_product_categories))
        .route("/api/product/getProducts", get(handlers::get_products))
        .route("/api/product/getDataBundle", get(handlers::get_data_bundle))
        .layer(middleware::from_fn_with_state(state.auth.clone(), auth::require_auth));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/product/cronReverseTimeoutUnreversedTransaction",
            get(handlers::cron_reverse_timeout),
        )
        .route(
            "/api/merchant/generateMerchantJwtToken",
            post(handlers::generate_merchant_jwt_token),
        )
        .merge(protected)
        .with_state(state)
}

/// Run the server on `addr` until `shutdown_signal` completes.
pub async fn serve<F>(state: Arc<AppState>, addr: SocketAddr, shutdown_signal: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let router = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    tracing::info!(%addr, "starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
}
