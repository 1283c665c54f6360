//! Request/response DTOs and handler bodies for every endpoint in spec §6.
//!
//! Every handler returns HTTP 200 with the `{responseCode, responseMessage,
//! responseData}` envelope carrying the real outcome — this crate never
//! uses the HTTP status line to carry domain-level failure, matching
//! `auth::require_auth`'s own error response and the original's single
//! JSON-envelope convention.

use super::AppState;
use crate::auth::{self, AuthContext};
use crate::catalog;
use crate::coordinator::{VendAirtimeRequest, VendDataRequest, VendOutcome};
use crate::error::{GatewayError, Result};
use crate::money::Money;
use crate::types::Envelope;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendAirtimeBody {
    product_code: String,
    phone_number: String,
    amount: Money,
    merchant_ref: String,
}

pub async fn vend_airtime(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<VendAirtimeBody>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .vend_airtime(
            &ctx.merchant,
            VendAirtimeRequest {
                product_code: body.product_code,
                phone_number: body.phone_number,
                amount: body.amount,
                merchant_ref: body.merchant_ref,
            },
        )
        .await;
    outcome_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendDataBody {
    product_code: String,
    data_code: String,
    phone_number: String,
    merchant_ref: String,
}

pub async fn vend_data(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<VendDataBody>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .vend_data(
            &ctx.merchant,
            VendDataRequest {
                product_code: body.product_code,
                data_code: body.data_code,
                phone_number: body.phone_number,
                merchant_ref: body.merchant_ref,
            },
        )
        .await;
    outcome_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequeryBody {
    merchant_ref: String,
}

pub async fn requery_transaction(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<RequeryBody>,
) -> impl IntoResponse {
    let result = state.coordinator.requery_transaction(&ctx.merchant, &body.merchant_ref).await;
    outcome_response(result)
}

/// Turn a `Result<VendOutcome>` into the envelope: on `Ok`, the outcome's
/// own response code/message (which may be 80, not just 00); on `Err`,
/// the standard error mapping.
fn outcome_response(result: Result<VendOutcome>) -> impl IntoResponse {
    let envelope = match result {
        Ok(outcome) => Envelope::with_code(outcome.response_code, outcome.response_message, Some(outcome.transaction)),
        Err(err) => {
            tracing::warn!(error = %err, "vend/requery request failed");
            Envelope::from_error(&err)
        }
    };
    (StatusCode::OK, Json(envelope))
}

pub async fn get_product_categories(
    State(state): State<Arc<AppState>>,
    Extension(_ctx): Extension<AuthContext>,
) -> impl IntoResponse {
    match catalog::list_active_categories(&state.pool, state.cache.as_ref()).await {
        Ok(categories) => (StatusCode::OK, Json(Envelope::ok("ok", categories))),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    category_code: String,
}

pub async fn get_products(
    State(state): State<Arc<AppState>>,
    Extension(_ctx): Extension<AuthContext>,
    Query(query): Query<CategoryQuery>,
) -> impl IntoResponse {
    match catalog::list_products_by_category(&state.pool, state.cache.as_ref(), &query.category_code).await {
        Ok(products) => (StatusCode::OK, Json(Envelope::ok("ok", products))),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    product_code: String,
}

pub async fn get_data_bundle(
    State(state): State<Arc<AppState>>,
    Extension(_ctx): Extension<AuthContext>,
    Query(query): Query<ProductQuery>,
) -> impl IntoResponse {
    let product = match catalog::find_product(&state.pool, state.cache.as_ref(), &query.product_code).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return error_response(GatewayError::NoDataFound(format!(
                "unknown product {}",
                query.product_code
            )))
        }
        Err(err) => return error_response(err),
    };

    let provider_account = match catalog::find_provider_account(&state.pool, product.preferred_provider_account_id).await {
        Ok(account) => account,
        Err(err) => return error_response(err),
    };

    match catalog::list_data_bundles(&state.pool, state.cache.as_ref(), &query.product_code, provider_account.provider_code).await {
        Ok(bundles) => (StatusCode::OK, Json(Envelope::ok("ok", bundles))),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Serialize)]
struct SweepSummary {
    reversed: usize,
}

pub async fn cron_reverse_timeout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.sweeper.sweep_once().await {
        Ok(reversed) => (StatusCode::OK, Json(Envelope::ok("sweep complete", SweepSummary { reversed }))),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateJwtBody {
    merchant_code: String,
    expiration_minutes: i64,
}

#[derive(Debug, Serialize)]
struct JwtResponse {
    token: String,
}

pub async fn generate_merchant_jwt_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateJwtBody>,
) -> impl IntoResponse {
    match auth::legacy_jwt::generate_merchant_token(&state.secret_key, &body.merchant_code, body.expiration_minutes) {
        Ok(token) => (StatusCode::OK, Json(Envelope::ok("ok", JwtResponse { token }))),
        Err(err) => error_response(err),
    }
}

fn error_response<T: Serialize>(err: GatewayError) -> (StatusCode, Json<Envelope<T>>) {
    tracing::warn!(error = %err, "request failed");
    (StatusCode::OK, Json(Envelope::from_error(&err)))
}
