//! `generate_report` output shape.

use cerebra_store::CostSummary;
use serde::Serialize;

/// A cost report spanning `[from, to)`, one ranked list per dimension.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Report {
    /// Top entries grouped by agent, ordered by cost descending.
    pub by_agent: Vec<CostSummaryRow>,
    /// Top entries grouped by team, ordered by cost descending.
    pub by_team: Vec<CostSummaryRow>,
    /// Top entries grouped by model, ordered by cost descending.
    pub by_model: Vec<CostSummaryRow>,
    /// Top entries grouped by provider, ordered by cost descending.
    pub by_provider: Vec<CostSummaryRow>,
}

/// Serializable mirror of [`CostSummary`] (which carries no `Serialize`
/// impl in the store crate, to keep that crate free of wire concerns).
#[derive(Debug, Clone, Serialize)]
pub struct CostSummaryRow {
    /// The grouped dimension value.
    pub key: String,
    /// Total cost across the group, as a string (exact decimal).
    pub total_cost: String,
    /// Number of requests in the group.
    pub request_count: i64,
    /// Total tokens across the group.
    pub total_tokens: i64,
    /// Average latency in milliseconds across the group.
    pub avg_latency_ms: f64,
    /// Total routing savings across the group, as a string.
    pub total_savings: String,
}

impl From<CostSummary> for CostSummaryRow {
    fn from(summary: CostSummary) -> Self {
        Self {
            key: summary.key,
            total_cost: summary.total_cost.to_string(),
            request_count: summary.request_count,
            total_tokens: summary.total_tokens,
            avg_latency_ms: summary.avg_latency_ms,
            total_savings: summary.total_savings.to_string(),
        }
    }
}

pub(crate) fn rows(summaries: Vec<CostSummary>) -> Vec<CostSummaryRow> {
    summaries.into_iter().map(CostSummaryRow::from).collect()
}
