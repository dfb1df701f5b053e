//! Pricing table and router registry types.

use crate::provider::ProviderKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only (provider, model) to per-token unit cost mapping.
///
/// Cost is always `(tokens / 1_000_000) * unit_rate`, summed over input and
/// output. Refreshed out of band; never mutated in place once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Upstream provider.
    pub provider: ProviderKind,
    /// Model identifier as sent to the provider.
    pub model: String,
    /// USD cost per 1,000,000 input tokens.
    pub input_per_million: Decimal,
    /// USD cost per 1,000,000 output tokens.
    pub output_per_million: Decimal,
    /// When this row was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl ModelPricing {
    /// Compute the USD cost of a request from token counts.
    #[must_use]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let million = Decimal::from(1_000_000u32);
        let input_cost = Decimal::from(input_tokens) / million * self.input_per_million;
        let output_cost = Decimal::from(output_tokens) / million * self.output_per_million;
        input_cost + output_cost
    }
}

/// Coarse capability class of a model. Totally ordered: `Economy < Standard
/// < Premium`, derived from declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheapest, lowest-capability tier.
    Economy,
    /// Mid-range tier.
    Standard,
    /// Highest-capability, most expensive tier.
    Premium,
}

/// Router registry entry: everything the smart router needs to know about
/// a candidate model beyond raw pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Upstream provider.
    pub provider: ProviderKind,
    /// Model identifier.
    pub model: String,
    /// Capability tier.
    pub tier: ModelTier,
    /// Normalized quality score in `[0, 1]`.
    pub quality_score: f64,
    /// Average observed latency in milliseconds (seeded, then updated by an
    /// exponential moving average as real requests complete).
    pub avg_latency_ms: f64,
    /// USD cost per 1,000,000 input tokens.
    pub input_per_million: Decimal,
    /// USD cost per 1,000,000 output tokens.
    pub output_per_million: Decimal,
    /// Running success rate in `[0, 1]`, seeded at 1.0.
    pub success_rate: f64,
}

impl ModelInfo {
    /// `1 - success_rate`, clamped to `[0, 1]`.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        (1.0 - self.success_rate).clamp(0.0, 1.0)
    }

    /// Cost of a hypothetical request against this model's pricing.
    #[must_use]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let million = Decimal::from(1_000_000u32);
        let input_cost = Decimal::from(input_tokens) / million * self.input_per_million;
        let output_cost = Decimal::from(output_tokens) / million * self.output_per_million;
        input_cost + output_cost
    }

    /// Feed a completed request's outcome back into the running latency EMA
    /// (alpha = 0.1) and success rate.
    pub fn record_observation(&mut self, latency_ms: f64, success: bool) {
        const ALPHA: f64 = 0.1;
        self.avg_latency_ms = ALPHA * latency_ms + (1.0 - ALPHA) * self.avg_latency_ms;
        let outcome = if success { 1.0 } else { 0.0 };
        self.success_rate = ALPHA * outcome + (1.0 - ALPHA) * self.success_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn info(tier: ModelTier) -> ModelInfo {
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".into(),
            tier,
            quality_score: 0.7,
            avg_latency_ms: 500.0,
            input_per_million: dec!(0.15),
            output_per_million: dec!(0.60),
            success_rate: 1.0,
        }
    }

    #[test]
    fn tier_ordering() {
        assert!(ModelTier::Economy < ModelTier::Standard);
        assert!(ModelTier::Standard < ModelTier::Premium);
    }

    #[test]
    fn cost_matches_happy_path_scenario() {
        let pricing = ModelPricing {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".into(),
            input_per_million: dec!(0.15),
            output_per_million: dec!(0.60),
            updated_at: Utc::now(),
        };
        assert_eq!(pricing.cost(100, 50), dec!(0.000045));
    }

    #[test]
    fn error_rate_tracks_success_rate() {
        let mut m = info(ModelTier::Economy);
        assert_eq!(m.error_rate(), 0.0);
        for _ in 0..5 {
            m.record_observation(400.0, false);
        }
        assert!(m.error_rate() > 0.0);
    }
}
