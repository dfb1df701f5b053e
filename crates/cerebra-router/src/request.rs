//! Inputs to [`crate::Router::route`].

use cerebra_core::{ModelTier, ProviderKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named selection strategy the router should apply once candidates are
/// filtered to the minimum tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Cheapest input unit cost among qualifying candidates.
    CostOptimized,
    /// Highest quality score, optionally budget-constrained.
    QualityFirst,
    /// Lowest observed average latency.
    LatencyOptimized,
    /// Weighted blend of cost, quality, and latency, tuned per complexity.
    Adaptive,
}

impl std::str::FromStr for RoutingStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost_optimized" => Ok(Self::CostOptimized),
            "quality_first" => Ok(Self::QualityFirst),
            "latency_optimized" => Ok(Self::LatencyOptimized),
            "adaptive" => Ok(Self::Adaptive),
            _ => Err(()),
        }
    }
}

/// A request to route, independent of any particular upstream call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Provider the caller explicitly asked for, if any.
    #[serde(default)]
    pub original_provider: Option<ProviderKind>,
    /// Model the caller explicitly asked for, if any.
    #[serde(default)]
    pub original_model: Option<String>,
    /// A tier floor the caller asked for, overriding complexity assessment.
    #[serde(default)]
    pub preferred_tier: Option<ModelTier>,
    /// Restrict candidate selection to one provider.
    #[serde(default)]
    pub preferred_provider: Option<ProviderKind>,
    /// The prompt text driving complexity assessment.
    #[serde(default)]
    pub input_text: String,
    /// Whether the request carries a system prompt.
    #[serde(default)]
    pub has_system_prompt: bool,
    /// A ceiling on estimated cost, consulted by `quality_first`.
    #[serde(default)]
    pub max_budget: Option<Decimal>,
    /// The selection strategy to apply.
    pub strategy: RoutingStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_from_wire_name() {
        assert_eq!("cost_optimized".parse(), Ok(RoutingStrategy::CostOptimized));
        assert_eq!("adaptive".parse(), Ok(RoutingStrategy::Adaptive));
        assert_eq!("quality_first".parse(), Ok(RoutingStrategy::QualityFirst));
        assert_eq!("latency_optimized".parse(), Ok(RoutingStrategy::LatencyOptimized));
        assert!("made_up".parse::<RoutingStrategy>().is_err());
    }
}
