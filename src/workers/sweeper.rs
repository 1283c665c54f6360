//! Time-based fallback for any `Pending` transaction the requery path
//! never resolves — a provider that never answers, a requery task lost to
//! a process restart, or a lease held by a worker that then crashed.
//!
//! Grounded on `original_source/apps/product/task.py`'s
//! `cron_reverse_timeout_unreversed_transaction`: select a bounded batch
//! of stale `Pending` rows, row-lock and re-verify each individually
//! before acting, credit back the debited amount, and mark `Failed`. Per
//! `DESIGN.md`'s Open Question #7, the staleness threshold here is the
//! two minutes spec'd for this gateway, not the original's five.

use crate::error::Result;
use crate::ledger;
use crate::store;
use crate::types::{FundingSource, TransactionStatus, TransactionUpdate};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// A transaction stuck `Pending` longer than this is considered timed out.
const TIMEOUT_THRESHOLD: StdDuration = StdDuration::from_secs(120);
/// Upper bound on rows reversed per sweep, so one run can't hold the
/// transactions table for an unbounded time; stragglers beyond this are
/// picked up on the next run.
const SWEEP_LIMIT: i64 = 100;
/// Cadence of the background sweep loop.
const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(7 * 60);

pub struct TimeoutSweeper {
    pool: PgPool,
}

impl TimeoutSweeper {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run one sweep, reversing every transaction that's been `Pending`
    /// past the timeout threshold. Returns the number actually reversed
    /// (a row selected by the batch query may no longer qualify by the
    /// time its individual lock is taken).
    pub async fn sweep_once(&self) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(TIMEOUT_THRESHOLD).expect("fits");
        let ids = store::find_timed_out_pending(&self.pool, cutoff, SWEEP_LIMIT).await?;

        let mut reversed = 0;
        for id in ids {
            match self.reverse_one(id, cutoff).await {
                Ok(true) => reversed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(transaction_id = id, error = %err, "timeout sweep failed for transaction");
                }
            }
        }
        Ok(reversed)
    }

    async fn reverse_one(&self, transaction_id: i64, cutoff: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let Some(txn) = store::find_by_id_locked(&mut tx, transaction_id).await? else {
            tx.commit().await?;
            return Ok(false);
        };
        if txn.status != TransactionStatus::Pending || !txn.needs_refund_on_failure() || txn.created_at > cutoff {
            tx.commit().await?;
            return Ok(false);
        }

        ledger::credit(&mut tx, txn.merchant_id, txn.discount_amount, FundingSource::AutoReversal, Some(txn.id)).await?;
        store::update(
            &mut tx,
            txn.id,
            TransactionUpdate {
                status: Some(TransactionStatus::Failed),
                provider_ref: None,
                provider_desc: Some("Transaction timed out".to_string()),
                is_reverse: Some(true),
                reversed_at: Some(Utc::now()),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Spawn the periodic sweep loop as a long-lived background task.
    pub fn spawn_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                match self.sweep_once().await {
                    Ok(n) if n > 0 => {
                        tracing::info!(reversed = n, "timeout sweep reversed stale pending transactions");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "timeout sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_threshold_matches_two_minutes() {
        assert_eq!(TIMEOUT_THRESHOLD, StdDuration::from_secs(120));
    }
}
