//! # Cerebra Store
//!
//! The durable store behind the Cerebra gateway: budgets, model pricing,
//! API keys, and the `api_requests` time-series log. Backed by
//! `sqlx::AnyPool` so the same code runs against Postgres in production
//! and SQLite in tests, migrated on connect by `cerebra-migrations`.
//!
//! This crate owns no business rules — it is pure persistence. The budget
//! enforcer (`cerebra-budget`) and analytics engine (`cerebra-analytics`)
//! own the semantics; this crate only reads and writes rows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api_keys;
mod budgets;
mod error;
mod pricing;
mod request_log;
mod store;

pub use error::{StoreError, StoreResult};
pub use request_log::{CostSummary, Dimension, UsageGroup};
pub use store::Store;
