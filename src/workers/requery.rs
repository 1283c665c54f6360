//! Follows up on a `PENDING` provider response by asking the provider
//! directly, a bounded number of times, before leaving the transaction
//! for the timeout sweeper.
//!
//! Grounded on `original_source/apps/product/task.py`'s
//! `trigger_provider_requery_task`: a non-blocking cache lease
//! (`requery-lock-{id}`, 60s TTL) deduplicates concurrent delivery of the
//! same task, the transaction is reloaded rather than trusted from the
//! task payload, and retries are capped at three attempts 20 seconds
//! apart — matching the original's `bind=True, max_retries=3,
//! default_retry_delay=10` combined with its explicit
//! `self.retry(countdown=20)` call on a repeat `PENDING`.

use crate::cache::{self, Cache};
use crate::catalog;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::ledger;
use crate::queue::{RequeryTask, TaskQueue};
use crate::store;
use crate::types::{FundingSource, TransactionStatus, TransactionUpdate};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(20);
const LEASE_TTL: Duration = Duration::from_secs(60);

/// Drains a [`RequeryTask`] channel, one `tokio::spawn`ed handler per
/// task so a slow provider call never blocks the next task in line.
pub struct RequeryWorker {
    pool: PgPool,
    cache: Arc<dyn Cache>,
    dispatcher: Arc<Dispatcher>,
    requery_queue: Arc<dyn TaskQueue<RequeryTask>>,
}

impl RequeryWorker {
    pub fn new(
        pool: PgPool,
        cache: Arc<dyn Cache>,
        dispatcher: Arc<Dispatcher>,
        requery_queue: Arc<dyn TaskQueue<RequeryTask>>,
    ) -> Self {
        Self { pool, cache, dispatcher, requery_queue }
    }

    /// Consume the channel until it closes (process shutdown). Run as a
    /// long-lived background task from `main`.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::Receiver<RequeryTask>) {
        while let Some(task) = receiver.recv().await {
            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = worker.handle(task).await {
                    tracing::error!(error = %err, "requery task failed");
                }
            });
        }
    }

    async fn handle(&self, task: RequeryTask) -> Result<()> {
        let lease_key = cache::key::requery_lease(task.transaction_id);
        match self.cache.try_lock(&lease_key, LEASE_TTL).await {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "requery lease check failed, proceeding anyway");
            }
        }

        let mut tx = self.pool.begin().await?;
        let txn = match store::find_by_id_locked(&mut tx, task.transaction_id).await? {
            Some(t) => t,
            None => {
                tx.commit().await?;
                return Ok(());
            }
        };
        let in_flight = matches!(txn.status, TransactionStatus::Pending | TransactionStatus::Processing);
        tx.commit().await?;
        if !in_flight {
            return Ok(());
        }

        let provider_account = catalog::find_provider_account(&self.pool, txn.provider_account_id).await?;
        let provider_ref = txn.provider_ref.clone().unwrap_or_else(|| txn.merchant_ref.to_string());
        let response = self.dispatcher.requery(&provider_account, &provider_ref).await;

        if response.is_success() {
            let mut tx = self.pool.begin().await?;
            store::update(
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
            return Ok(());
        }

        if response.is_pending() {
            let mut tx = self.pool.begin().await?;
            let desc = if task.attempt + 1 < MAX_ATTEMPTS {
                response.message.clone()
            } else {
                format!("requery retries exhausted: {}", response.message)
            };
            store::update(
                &mut tx,
                txn.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Processing),
                    provider_ref: response.provider_ref.clone(),
                    provider_desc: Some(desc),
                    is_reverse: None,
                    reversed_at: None,
                },
            )
            .await?;
            tx.commit().await?;

            if task.attempt + 1 < MAX_ATTEMPTS {
                self.requery_queue
                    .schedule(RequeryTask { transaction_id: txn.id, attempt: task.attempt + 1 }, RETRY_DELAY)
                    .await;
            }
            return Ok(());
        }

        // INVALID_MSISDN / FAILED / anything else: refund (unless some
        // other path already reversed this transaction) and close out.
        // The is_reverse check happens inside the row lock so two
        // concurrent resolutions (requery vs sweeper) can't double-credit.
        let mut tx = self.pool.begin().await?;
        let locked = store::find_by_id_locked(&mut tx, txn.id)
            .await?
            .ok_or_else(|| crate::error::GatewayError::TransactionNotFound(txn.id.to_string()))?;
        if locked.needs_refund_on_failure() {
            ledger::credit(&mut tx, locked.merchant_id, locked.discount_amount, FundingSource::AutoReversal, Some(locked.id))
                .await?;
        }
        store::update(
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_budget_matches_the_original_celery_task() {
        assert_eq!(MAX_ATTEMPTS, 3);
        assert_eq!(RETRY_DELAY, Duration::from_secs(20));
    }
}
