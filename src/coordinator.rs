//! C7 — the vending coordinator: the state-machine owner for a vend
//! request.
//!
//! Grounded on `original_source/apps/product/views.py`'s `vend_vtu` /
//! `vend_data` and their shared helpers `_check_and_reset_transaction_limit`
//! / `_calculate_discounted_amount` / `_debit_and_create_transaction` /
//! `_handle_provider_response`. The seven numbered steps below are that
//! same sequence, generalized over airtime/data through [`VendKind`]
//! instead of two near-duplicate handler methods.

use crate::cache::Cache;
use crate::catalog;
use crate::dispatcher::Dispatcher;
use crate::error::{GatewayError, Result};
use crate::ledger;
use crate::money::Money;
use crate::provider::{NormalizedResponse, VendRequest};
use crate::queue::{RequeryTask, TaskQueue};
use crate::store;
use crate::types::{
    resolve_best_discount, FundingSource, Merchant, MerchantRef, Msisdn, ProductCategoryKind,
    Transaction, TransactionStatus, TransactionUpdate,
};
use chrono::Utc;
use chrono_tz::Africa::Lagos;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Initial delay before the first requery attempt on a PENDING response.
const REQUERY_INITIAL_DELAY: Duration = Duration::from_secs(30);

/// Owns the database pool, the shared cache, the provider dispatcher, and
/// the requery queue — everything needed to drive a vend request from
/// validated payload to terminal (or pending-with-scheduled-follow-up)
/// transaction state.
pub struct Coordinator {
    pool: PgPool,
    cache: Arc<dyn Cache>,
    dispatcher: Arc<Dispatcher>,
    requery_queue: Arc<dyn TaskQueue<RequeryTask>>,
}

/// Payload for `POST /api/product/vendAirtime`.
pub struct VendAirtimeRequest {
    pub product_code: String,
    pub phone_number: String,
    pub amount: Money,
    pub merchant_ref: String,
}

/// Payload for `POST /api/product/vendData`.
pub struct VendDataRequest {
    pub product_code: String,
    pub data_code: String,
    pub phone_number: String,
    pub merchant_ref: String,
}

/// What a vend/requery call hands back to the HTTP layer: the resulting
/// transaction plus the normalized response code/message to put in the
/// envelope. These can diverge from a plain success/failure split — a
/// `PENDING` dispatch is reported as code 80 even though the transaction
/// was created and debited successfully.
pub struct VendOutcome {
    pub transaction: Transaction,
    pub response_code: &'static str,
    pub response_message: String,
}

enum VendKind {
    Airtime { amount: Money },
    Data { data_code: String },
}

impl Coordinator {
    pub fn new(
        pool: PgPool,
        cache: Arc<dyn Cache>,
        dispatcher: Arc<Dispatcher>,
        requery_queue: Arc<dyn TaskQueue<RequeryTask>>,
    ) -> Self {
        Self { pool, cache, dispatcher, requery_queue }
    }

    /// Vend airtime. Step 1's amount-positivity check is enforced here;
    /// everything else funnels through [`Coordinator::vend`].
    pub async fn vend_airtime(&self, merchant: &Merchant, req: VendAirtimeRequest) -> Result<VendOutcome> {
        if !req.amount.is_positive() {
            return Err(GatewayError::InvalidPayload("amount must be > 0".to_string()));
        }
        self.vend(
            merchant,
            &req.product_code,
            &req.phone_number,
            &req.merchant_ref,
            VendKind::Airtime { amount: req.amount },
        )
        .await
    }

    /// Vend a data bundle.
    pub async fn vend_data(&self, merchant: &Merchant, req: VendDataRequest) -> Result<VendOutcome> {
        self.vend(
            merchant,
            &req.product_code,
            &req.phone_number,
            &req.merchant_ref,
            VendKind::Data { data_code: req.data_code },
        )
        .await
    }

    async fn vend(
        &self,
        merchant: &Merchant,
        product_code: &str,
        phone_number: &str,
        merchant_ref: &str,
        kind: VendKind,
    ) -> Result<VendOutcome> {
        // Step 1: validate payload.
        let destination = Msisdn::normalize(phone_number).map_err(GatewayError::InvalidPayload)?;
        let merchant_ref = MerchantRef::new(merchant_ref).map_err(GatewayError::InvalidPayload)?;

        // Step 2: resolve product, enforce category.
        let expected_category = match kind {
            VendKind::Airtime { .. } => ProductCategoryKind::Airtime,
            VendKind::Data { .. } => ProductCategoryKind::Data,
        };
        let product = catalog::find_product(&self.pool, self.cache.as_ref(), product_code)
            .await?
            .ok_or_else(|| GatewayError::NoDataFound(format!("unknown product {product_code}")))?;
        if product.category != expected_category {
            return Err(GatewayError::InvalidPayload(format!(
                "product {product_code} is not a {expected_category:?} product"
            )));
        }

        let provider_account =
            catalog::find_provider_account(&self.pool, product.preferred_provider_account_id).await?;

        // Resolve the dispatch amount and provider-facing plan code: for
        // airtime the merchant-supplied amount goes straight to the
        // provider; for data, the bundle's own price does, and the
        // merchant-facing data_code is translated to the provider's own
        // plan code.
        let (provider_amount, data_package_code) = match &kind {
            VendKind::Airtime { amount } => (*amount, None),
            VendKind::Data { data_code } => {
                let bundle = catalog::find_data_package(
                    &self.pool,
                    self.cache.as_ref(),
                    product_code,
                    data_code,
                    provider_account.provider_code,
                )
                .await?
                .ok_or_else(|| GatewayError::NoDataFound(format!("unknown data bundle {data_code}")))?;

                let plan_code = catalog::provider_plan_code(&self.pool, bundle.id, provider_account.id)
                    .await?
                    .ok_or_else(|| {
                        GatewayError::NoDataFound(format!(
                            "bundle {data_code} is not mapped to provider account {}",
                            provider_account.id
                        ))
                    })?;

                (bundle.price, Some(plan_code))
            }
        };

        // Step 3: resolve the merchant's best discount for this product.
        let discounts = catalog::discounts_for(&self.pool, merchant.id, product.id).await?;
        let resolved_discount = resolve_best_discount(&discounts);

        // Step 4: enforce and advance the daily transaction count.
        let today = Utc::now().with_timezone(&Lagos).date_naive();
        ledger::check_and_increment_daily_limit(&self.pool, merchant.id, today).await?;

        // Step 5: apply the discount.
        let discounted_amount = match resolved_discount {
            Some(discount) => discount.apply(provider_amount),
            None => provider_amount,
        };

        // Step 6: debit and insert, in one transaction.
        let mut tx = self.pool.begin().await?;
        let debited_merchant = ledger::debit(&mut tx, merchant.id, discounted_amount).await?;
        let new_txn = store::create(
            &mut tx,
            store::NewTransaction {
                merchant_ref,
                merchant_id: merchant.id,
                amount: provider_amount,
                discount_amount: discounted_amount,
                balance_before: debited_merchant.balance_before,
                balance_after: debited_merchant.current_balance,
                beneficiary_account: destination.clone(),
                product_code: product_code.to_string(),
                product_category: category_str(expected_category).to_string(),
                provider_account_id: provider_account.id,
            },
        )
        .await?;
        tx.commit().await?;

        // Step 7: dispatch and reconcile.
        let response = self
            .dispatcher
            .vend(
                &provider_account,
                &VendRequest {
                    destination,
                    amount: provider_amount.as_decimal(),
                    product_code: product_code.to_string(),
                    data_package_code,
                },
            )
            .await;

        self.reconcile(new_txn, response).await
    }

    /// Client-initiated `requeryTransaction`: reloads the transaction and,
    /// if still in flight, asks the provider directly rather than waiting
    /// for the scheduled background requery.
    pub async fn requery_transaction(&self, merchant: &Merchant, merchant_ref: &str) -> Result<VendOutcome> {
        let merchant_ref = MerchantRef::new(merchant_ref).map_err(GatewayError::InvalidPayload)?;
        let mut tx = self.pool.begin().await?;
        let txn = store::find_by_merchant_ref(&mut tx, &merchant_ref)
            .await?
            .ok_or_else(|| GatewayError::TransactionNotFound(merchant_ref.to_string()))?;
        tx.commit().await?;

        if txn.merchant_id != merchant.id {
            return Err(GatewayError::TransactionNotFound(merchant_ref.to_string()));
        }
        if txn.status.is_terminal() {
            let (response_code, response_message) = match txn.status {
                TransactionStatus::Success => ("00", "transaction already successful".to_string()),
                TransactionStatus::Failed => ("04", "transaction already failed".to_string()),
                TransactionStatus::Pending | TransactionStatus::Processing => unreachable!("not terminal"),
            };
            return Ok(VendOutcome { transaction: txn, response_code, response_message });
        }

        let provider_account = catalog::find_provider_account(&self.pool, txn.provider_account_id).await?;
        let response = self
            .dispatcher
            .requery(&provider_account, txn.provider_ref.as_deref().unwrap_or(&txn.merchant_ref.to_string()))
            .await;

        self.reconcile(txn, response).await
    }

    /// Apply a normalized provider response to a freshly created or
    /// reloaded transaction: SUCCESS, PENDING (with a scheduled requery),
    /// or anything else (refund + Failed), per spec step 4.7.7. The
    /// returned response code/message always come straight from `response`
    /// — it already speaks the gateway's own code space (see
    /// [`NormalizedResponse`]).
    async fn reconcile(&self, txn: Transaction, response: NormalizedResponse) -> Result<VendOutcome> {
        if response.is_success() {
            let mut tx = self.pool.begin().await?;
            let updated = store::update(
                &mut tx,
                txn.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Success),
                    provider_ref: response.provider_ref.clone(),
                    provider_desc: Some(response.message.clone()),
                    is_reverse: None,
                    reversed_at: None,
                },
            )
            .await?;
            tx.commit().await?;
            return Ok(VendOutcome {
                transaction: updated,
                response_code: response.code,
                response_message: response.message,
            });
        }

        if response.is_pending() {
            let mut tx = self.pool.begin().await?;
            let updated = store::update(
                &mut tx,
                txn.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Processing),
                    provider_ref: response.provider_ref.clone(),
                    provider_desc: Some(response.message.clone()),
                    is_reverse: None,
                    reversed_at: None,
                },
            )
            .await?;
            tx.commit().await?;

            self.requery_queue
                .schedule(RequeryTask { transaction_id: txn.id, attempt: 0 }, REQUERY_INITIAL_DELAY)
                .await;

            return Ok(VendOutcome {
                transaction: updated,
                response_code: response.code,
                response_message: response.message,
            });
        }

        // INVALID_MSISDN / FAILED / anything else: refund (unless this
        // transaction was somehow already reversed) and close out.
        let mut tx = self.pool.begin().await?;
        if txn.needs_refund_on_failure() {
            ledger::credit(
                &mut tx,
                txn.merchant_id,
                txn.discount_amount,
                FundingSource::AutoReversal,
                Some(txn.id),
            )
            .await?;
        }
        let updated = store::update(
            &mut tx,
            txn.id,
            TransactionUpdate {
                status: Some(TransactionStatus::Failed),
                provider_ref: response.provider_ref.clone(),
                provider_desc: Some(response.message.clone()),
                is_reverse: Some(true),
                reversed_at: Some(Utc::now()),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(VendOutcome {
            transaction: updated,
            response_code: response.code,
            response_message: response.message,
        })
    }
}

fn category_str(kind: ProductCategoryKind) -> &'static str {
    match kind {
        ProductCategoryKind::Airtime => "AIRTIME",
        ProductCategoryKind::Data => "DATA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_str_matches_wire_format() {
        assert_eq!(category_str(ProductCategoryKind::Airtime), "AIRTIME");
        assert_eq!(category_str(ProductCategoryKind::Data), "DATA");
    }
}
