//! C2 — the transaction store: create-once, update-only access to the
//! `transactions` table.
//!
//! Grounded on `original_source/apps/product/views.py`'s
//! `_debit_and_create_transaction`: a transaction row is inserted exactly
//! once per `merchant_ref`, inside the same database transaction as the
//! ledger debit, and every later touch (provider response, requery,
//! reversal) is an `UPDATE` against the whitelisted field set in
//! [`crate::types::TransactionUpdate`]. A unique constraint on
//! `merchant_ref` is what makes the vend endpoint idempotent; a
//! constraint violation surfaces as [`GatewayError::Processing`] (code
//! 06), not a generic database error, so callers can tell "duplicate
//! request" apart from "the database is unhappy."

use crate::error::{GatewayError, Result};
use crate::money::Money;
use crate::types::{MerchantRef, Msisdn, Transaction, TransactionStatus, TransactionUpdate};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};

/// Insert a new transaction row. Must be called inside the same
/// [`sqlx::Transaction`] as the corresponding ledger debit, so a crash
/// between the two can never leave a debited balance with no
/// transaction record (or vice versa).
pub async fn create(
    tx: &mut SqlxTransaction<'_, Postgres>,
    new: NewTransaction,
) -> Result<Transaction> {
    let row: TransactionRow = sqlx::query_as(
        "INSERT INTO transactions \
         (merchant_ref, merchant_id, amount, discount_amount, balance_before, balance_after, \
          beneficiary_account, product_code, product_category, provider_account_id, status, \
          is_reverse, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, false, now(), now()) \
         RETURNING id, merchant_ref, merchant_id, amount, discount_amount, balance_before, \
                   balance_after, beneficiary_account, product_code, product_category, \
                   provider_account_id, status, provider_ref, provider_desc, is_reverse, \
                   reversed_at, created_at, updated_at",
    )
    .bind(new.merchant_ref.as_str())
    .bind(new.merchant_id)
    .bind(new.amount.as_decimal())
    .bind(new.discount_amount.as_decimal())
    .bind(new.balance_before.as_decimal())
    .bind(new.balance_after.as_decimal())
    .bind(new.beneficiary_account.as_str())
    .bind(&new.product_code)
    .bind(&new.product_category)
    .bind(new.provider_account_id)
    .bind(status_str(TransactionStatus::Pending))
    .fetch_one(&mut **tx)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            GatewayError::Processing(format!(
                "duplicate merchant_ref: {}",
                new.merchant_ref.as_str()
            ))
        }
        _ => GatewayError::Database(err),
    })?;

    row.try_into()
}

/// Apply a whitelisted set of field updates to a transaction, row-locked
/// for the duration of the write. Used after a provider response, after
/// a requery, and after a timeout-driven reversal.
pub async fn update(
    tx: &mut SqlxTransaction<'_, Postgres>,
    transaction_id: i64,
    update: TransactionUpdate,
) -> Result<Transaction> {
    let current: TransactionRow = sqlx::query_as(
        "SELECT id, merchant_ref, merchant_id, amount, discount_amount, balance_before, \
                balance_after, beneficiary_account, product_code, product_category, \
                provider_account_id, status, provider_ref, provider_desc, is_reverse, \
                reversed_at, created_at, updated_at \
         FROM transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| GatewayError::TransactionNotFound(transaction_id.to_string()))?;

    let status = update.status.unwrap_or(current.status()?);

    let row: TransactionRow = sqlx::query_as(
        "UPDATE transactions \
         SET status = $1, provider_ref = $2, provider_desc = $3, is_reverse = $4, \
             reversed_at = $5, updated_at = now() \
         WHERE id = $6 \
         RETURNING id, merchant_ref, merchant_id, amount, discount_amount, balance_before, \
                   balance_after, beneficiary_account, product_code, product_category, \
                   provider_account_id, status, provider_ref, provider_desc, is_reverse, \
                   reversed_at, created_at, updated_at",
    )
    .bind(status_str(status))
    .bind(update.provider_ref.or(current.provider_ref.clone()))
    .bind(update.provider_desc.or(current.provider_desc.clone()))
    .bind(update.is_reverse.unwrap_or(current.is_reverse))
    .bind(update.reversed_at.or(current.reversed_at))
    .bind(transaction_id)
    .fetch_one(&mut **tx)
    .await?;

    row.try_into()
}

/// Row-lock and load a transaction by its numeric id, for callers that
/// already intend to update it (the requery worker, the timeout sweeper).
pub async fn find_by_id_locked(
    tx: &mut SqlxTransaction<'_, Postgres>,
    transaction_id: i64,
) -> Result<Option<Transaction>> {
    let row: Option<TransactionRow> = sqlx::query_as(
        "SELECT id, merchant_ref, merchant_id, amount, discount_amount, balance_before, \
                balance_after, beneficiary_account, product_code, product_category, \
                provider_account_id, status, provider_ref, provider_desc, is_reverse, \
                reversed_at, created_at, updated_at \
         FROM transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Look up a transaction by its merchant-assigned idempotency key.
pub async fn find_by_merchant_ref(
    tx: &mut SqlxTransaction<'_, Postgres>,
    merchant_ref: &MerchantRef,
) -> Result<Option<Transaction>> {
    let row: Option<TransactionRow> = sqlx::query_as(
        "SELECT id, merchant_ref, merchant_id, amount, discount_amount, balance_before, \
                balance_after, beneficiary_account, product_code, product_category, \
                provider_account_id, status, provider_ref, provider_desc, is_reverse, \
                reversed_at, created_at, updated_at \
         FROM transactions WHERE merchant_ref = $1",
    )
    .bind(merchant_ref.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// List ids of transactions the timeout sweeper should reverse: still
/// `Pending`, never reversed, older than `cutoff`. Capped at `limit` per
/// sweep so one run can't hold the table for an unbounded time; a cutoff
/// with more than `limit` stragglers just gets picked up on the next run.
pub async fn find_timed_out_pending(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<i64>> {
    let ids: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM transactions \
         WHERE status = 'Pending' AND is_reverse = false AND created_at <= $1 \
         ORDER BY created_at ASC LIMIT $2",
    )
    .bind(cutoff)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Fields required to insert a new transaction row. Kept separate from
/// [`Transaction`] itself since several fields (`status`, timestamps,
/// `id`) are assigned by the store, not the caller.
pub struct NewTransaction {
    pub merchant_ref: MerchantRef,
    pub merchant_id: i64,
    pub amount: Money,
    pub discount_amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub beneficiary_account: Msisdn,
    pub product_code: String,
    pub product_category: String,
    pub provider_account_id: i64,
}

fn status_str(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "Pending",
        TransactionStatus::Processing => "Processing",
        TransactionStatus::Success => "Success",
        TransactionStatus::Failed => "Failed",
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    merchant_ref: String,
    merchant_id: i64,
    amount: rust_decimal::Decimal,
    discount_amount: rust_decimal::Decimal,
    balance_before: rust_decimal::Decimal,
    balance_after: rust_decimal::Decimal,
    beneficiary_account: String,
    product_code: String,
    product_category: String,
    provider_account_id: i64,
    status: String,
    provider_ref: Option<String>,
    provider_desc: Option<String>,
    is_reverse: bool,
    reversed_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn status(&self) -> Result<TransactionStatus> {
        parse_status(&self.status)
    }
}

fn parse_status(raw: &str) -> Result<TransactionStatus> {
    match raw {
        "Pending" => Ok(TransactionStatus::Pending),
        "Processing" => Ok(TransactionStatus::Processing),
        "Success" => Ok(TransactionStatus::Success),
        "Failed" => Ok(TransactionStatus::Failed),
        other => Err(GatewayError::Database(sqlx::Error::Decode(
            format!("unrecognized transaction status: {other}").into(),
        ))),
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = GatewayError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let status = row.status()?;
        Ok(Transaction {
            id: row.id,
            merchant_ref: MerchantRef::new(row.merchant_ref).map_err(GatewayError::Domain)?,
            merchant_id: row.merchant_id,
            amount: Money::new(row.amount),
            discount_amount: Money::new(row.discount_amount),
            balance_before: Money::new(row.balance_before),
            balance_after: Money::new(row.balance_after),
            beneficiary_account: Msisdn::normalize(&row.beneficiary_account)
                .map_err(GatewayError::Domain)?,
            product_code: row.product_code,
            product_category: row.product_category,
            provider_account_id: row.provider_account_id,
            status,
            provider_ref: row.provider_ref,
            provider_desc: row.provider_desc,
            is_reverse: row.is_reverse,
            reversed_at: row.reversed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_status() {
        assert_eq!(parse_status("Pending").unwrap(), TransactionStatus::Pending);
        assert_eq!(
            parse_status("Processing").unwrap(),
            TransactionStatus::Processing
        );
        assert_eq!(parse_status("Success").unwrap(), TransactionStatus::Success);
        assert_eq!(parse_status("Failed").unwrap(), TransactionStatus::Failed);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(parse_status("Bogus").is_err());
    }
}
