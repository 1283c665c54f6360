//! # vas-gateway
//!
//! A VAS (value-added services) reselling gateway: merchants buy airtime
//! and data bundles through a single HTTP API, and this crate vends each
//! request to one of six upstream telco/aggregator providers, tracking
//! balances, discounts, and in-flight transactions along the way.
//!
//! ## Architecture
//!
//! - [`ledger`] — atomic merchant balance debit/credit (C1)
//! - [`store`] — the transaction-of-record table, create-once/update-only (C2)
//! - [`cache`] — a shared, read-through cache in front of catalog/auth lookups (C3)
//! - [`provider`] — one adapter per upstream telco/aggregator (C4)
//! - [`dispatcher`] — routes a vend/requery call to the right adapter (C5)
//! - [`auth`] — per-request HMAC authentication (C6), plus the legacy JWT
//!   issuance endpoint (A5)
//! - [`coordinator`] — the seven-step vend state machine (C7)
//! - [`workers`] — the requery follow-up and timeout sweeper background jobs (C8)
//! - [`catalog`] — product/category/data-bundle/discount lookups backing C7
//! - [`queue`] — the typed, in-process task queue standing in for a broker
//! - [`http`] — the axum router and handlers for spec §6's endpoints (A3)
//! - [`config`] — process configuration, loaded once from the environment
//! - [`money`] — a validated fixed-point type for every `decimal(12,2)` column
//! - [`types`] — the shared data model: merchants, transactions, products,
//!   providers, discounts, the funding audit log
//! - [`error`] — the normalized response-code taxonomy every layer speaks

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod ledger;
pub mod money;
pub mod provider;
pub mod queue;
pub mod store;
pub mod types;
pub mod workers;

pub use config::AppConfig;
pub use coordinator::Coordinator;
pub use error::{GatewayError, Result};
