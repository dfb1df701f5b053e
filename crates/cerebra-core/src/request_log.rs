//! The time-series accounting unit: [`ApiRequest`].

use crate::provider::ProviderKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Routing metadata attached to a proxied request when the smart router
/// substituted a different model than the one the client asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingOutcome {
    /// Whether the router changed the requested model.
    pub was_routed: bool,
    /// The model the client originally asked for, if any.
    pub original_model: Option<String>,
    /// The model actually dispatched to, if routing occurred.
    pub routed_model: Option<String>,
    /// Estimated USD saved by routing, if any.
    pub savings: Option<Decimal>,
}

/// One completed proxy request, as recorded for billing and analytics.
///
/// Never carries prompt or completion content — only identifiers, counts,
/// and timings. Created once by the proxy path after the upstream response
/// completes; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Unique id for this request.
    pub id: uuid::Uuid,
    /// Upstream provider dispatched to.
    pub provider: ProviderKind,
    /// Model identifier actually used.
    pub model: String,
    /// Asserted agent id, if any (`X-Agent-ID`).
    pub agent_id: Option<String>,
    /// Asserted team id, if any (`X-Team-ID`).
    pub team_id: Option<String>,
    /// Asserted org id, if any (`X-Org-ID`).
    pub org_id: Option<String>,
    /// Prompt tokens consumed.
    pub input_tokens: u64,
    /// Completion tokens produced.
    pub output_tokens: u64,
    /// `input_tokens + output_tokens` (or the upstream's own total, if it
    /// disagrees — see usage-extraction rules in the proxy path).
    pub total_tokens: u64,
    /// Computed USD cost of this request.
    pub cost: Decimal,
    /// Wall-clock latency of the upstream round trip, in milliseconds.
    pub latency_ms: u64,
    /// Upstream HTTP status code.
    pub status_code: u16,
    /// Routing metadata, if the smart router was consulted.
    pub routing: RoutingOutcome,
    /// When the request completed.
    pub timestamp: DateTime<Utc>,
}

impl ApiRequest {
    /// Builder entry point used by the proxy path once the upstream
    /// response and usage figures are known.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        provider: ProviderKind,
        model: impl Into<String>,
        agent_id: Option<String>,
        team_id: Option<String>,
        org_id: Option<String>,
        input_tokens: u64,
        output_tokens: u64,
        cost: Decimal,
        latency_ms: u64,
        status_code: u16,
    ) -> Self {
        let total_tokens = input_tokens + output_tokens;
        Self {
            id: uuid::Uuid::new_v4(),
            provider,
            model: model.into(),
            agent_id,
            team_id,
            org_id,
            input_tokens,
            output_tokens,
            total_tokens,
            cost,
            latency_ms,
            status_code,
            routing: RoutingOutcome::default(),
            timestamp: Utc::now(),
        }
    }

    /// Attach routing metadata produced by the smart router.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingOutcome) -> Self {
        self.routing = routing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_computes_total_tokens() {
        let req = ApiRequest::new(
            ProviderKind::OpenAI,
            "gpt-4o-mini",
            Some("a1".into()),
            None,
            None,
            100,
            50,
            dec!(0.000045),
            120,
            200,
        );
        assert_eq!(req.total_tokens, 150);
    }

    #[test]
    fn replaying_same_request_gets_fresh_id() {
        let a = ApiRequest::new(
            ProviderKind::OpenAI,
            "gpt-4o-mini",
            None,
            None,
            None,
            1,
            1,
            Decimal::ZERO,
            1,
            200,
        );
        let b = ApiRequest::new(
            ProviderKind::OpenAI,
            "gpt-4o-mini",
            None,
            None,
            None,
            1,
            1,
            Decimal::ZERO,
            1,
            200,
        );
        assert_ne!(a.id, b.id);
    }
}
