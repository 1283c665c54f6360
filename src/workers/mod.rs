//! C8 — the two background jobs that keep in-flight transactions moving
//! after the HTTP response has already gone back to the merchant:
//! [`requery`]'s provider-driven follow-up on a `PENDING` dispatch, and
//! [`sweeper`]'s time-based fallback for anything the requery path never
//! resolves.
//!
//! Grounded on `original_source/apps/product/task.py`'s
//! `trigger_provider_requery_task` and `cron_reverse_timeout_unreversed_transaction`.

pub mod requery;
pub mod sweeper;

pub use requery::RequeryWorker;
pub use sweeper::TimeoutSweeper;
