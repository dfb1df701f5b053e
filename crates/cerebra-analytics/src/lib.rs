//! # Cerebra Analytics
//!
//! Read-only analytics over the durable request log: spike detection,
//! model-switch recommendations, and cost reports. See [`AnalyticsEngine`]
//! for the four operations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod report;
mod switches;

pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, AnalyticsResult};
pub use report::{CostSummaryRow, Report};
