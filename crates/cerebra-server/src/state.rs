//! Shared application state, handed to every handler through Axum's
//! `State` extractor.

use crate::log_writer::LogWriterHandle;
use cerebra_analytics::AnalyticsEngine;
use cerebra_budget::BudgetEnforcer;
use cerebra_cache::FastCache;
use cerebra_config::GatewayConfig;
use cerebra_core::PricingTable;
use cerebra_router::Router;
use cerebra_store::Store;
use cerebra_telemetry::AuditLogger;
use std::sync::Arc;
use std::time::Duration;

/// Everything a request handler needs, cloned cheaply per request
/// (everything inside is itself an `Arc`, a pool handle, or a plain
/// value).
#[derive(Clone)]
pub struct AppState {
    /// Durable store: budgets, api keys, pricing, the request log.
    pub store: Store,
    /// Fast cache: budget spend counters and the rate limiter.
    pub cache: Arc<dyn FastCache>,
    /// Budget check-and-commit.
    pub budget: Arc<BudgetEnforcer>,
    /// Smart router over the model registry.
    pub router: Router,
    /// Read-only cost analytics.
    pub analytics: Arc<AnalyticsEngine>,
    /// Read-mostly pricing table, consulted for cost computation and the
    /// proxy path's pre-flight estimate.
    pub pricing: Arc<PricingTable>,
    /// Handle to enqueue completed requests onto the background log
    /// writer; never awaited on the response path.
    pub log_writer: LogWriterHandle,
    /// HTTP client used for upstream provider dispatch: pooled,
    /// keep-alive, a single bounded idle-connection pool shared across
    /// all requests.
    pub http_client: reqwest::Client,
    /// Loaded process configuration.
    pub config: Arc<GatewayConfig>,
    /// Structured audit trail for budget and rate-limit decisions.
    pub audit: Arc<AuditLogger>,
}

/// Default rate limit: 100 requests per key per minute, per the design's
/// stated default.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 100;

/// Upper bound on how long a budget pre-check may take before the
/// request fails fast rather than block the proxy path.
pub const BUDGET_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
