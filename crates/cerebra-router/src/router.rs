//! Ties complexity assessment, tiering, candidate filtering, and
//! strategy-based selection into the single `route` operation.

use crate::complexity::{self, Complexity};
use crate::decision::RouteDecision;
use crate::registry::ModelRegistry;
use crate::request::{RouteRequest, RoutingStrategy};
use crate::strategy;
use cerebra_core::{ModelInfo, ModelTier};
use rust_decimal::Decimal;

/// The smart router: complexity assessment, minimum-tier enforcement, and
/// strategy-driven candidate selection over a [`ModelRegistry`].
#[derive(Clone)]
pub struct Router {
    registry: ModelRegistry,
}

impl Router {
    /// Build a router over the given model catalogue.
    #[must_use]
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Access the underlying registry, e.g. for `/v1/router/models` or to
    /// feed back runtime observations.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Route a request to a model under its requested strategy.
    #[must_use]
    pub fn route(&self, request: &RouteRequest) -> Option<RouteDecision> {
        if let Some(decision) = self.try_explicit_honoring(request) {
            return Some(decision);
        }

        let complexity = complexity::assess(&request.input_text, request.has_system_prompt);
        let minimum_tier = request.preferred_tier.unwrap_or_else(|| complexity.minimum_tier());

        let mut candidates = self.registry.candidates(minimum_tier, request.preferred_provider);
        let mut tier_filter_emptied = false;
        if candidates.is_empty() {
            tier_filter_emptied = true;
            candidates = self.registry.all(request.preferred_provider);
        }
        if candidates.is_empty() {
            return None;
        }

        let (chosen, reason) = self.select(&candidates, request, complexity, tier_filter_emptied)?;
        Some(self.build_decision(request, chosen, reason))
    }

    fn try_explicit_honoring(&self, request: &RouteRequest) -> Option<RouteDecision> {
        let provider = request.original_provider?;
        let model_name = request.original_model.as_ref()?;
        let candidate = self.registry.get(provider, model_name)?;

        if let Some(preferred) = request.preferred_tier {
            if preferred != candidate.tier {
                return None;
            }
        }

        Some(RouteDecision {
            provider: candidate.provider,
            model: candidate.model.clone(),
            tier: candidate.tier,
            estimated_cost: estimate_cost(&request.input_text, &candidate),
            was_rerouted: false,
            reason: "explicit model honored".to_string(),
        })
    }

    fn select<'a>(
        &self,
        candidates: &'a [ModelInfo],
        request: &RouteRequest,
        complexity: Complexity,
        tier_filter_emptied: bool,
    ) -> Option<(&'a ModelInfo, String)> {
        let fallback_note = if tier_filter_emptied {
            " (tier filter emptied the set; fell back to cheapest overall)"
        } else {
            ""
        };

        match request.strategy {
            RoutingStrategy::CostOptimized => {
                let chosen = strategy::cost_optimized(candidates)?;
                Some((chosen, format!("cost_optimized: lowest input unit cost{fallback_note}")))
            }
            RoutingStrategy::QualityFirst => {
                let chosen = strategy::quality_first(candidates, request.max_budget)?;
                let reason = if request.max_budget.is_some() {
                    "quality_first: highest quality within max_budget".to_string()
                } else {
                    "quality_first: highest quality_score".to_string()
                };
                Some((chosen, reason))
            }
            RoutingStrategy::LatencyOptimized => {
                let chosen = strategy::latency_optimized(candidates)?;
                Some((chosen, "latency_optimized: lowest avg_latency_ms".to_string()))
            }
            RoutingStrategy::Adaptive => {
                let chosen = strategy::adaptive(candidates, complexity)?;
                Some((chosen, format!("adaptive: weighted score for {complexity:?} complexity")))
            }
        }
    }

    fn build_decision(&self, request: &RouteRequest, chosen: &ModelInfo, reason: String) -> RouteDecision {
        let was_rerouted = match (&request.original_provider, &request.original_model) {
            (Some(provider), Some(model)) => *provider != chosen.provider || model != &chosen.model,
            _ => false,
        };

        RouteDecision {
            provider: chosen.provider,
            model: chosen.model.clone(),
            tier: chosen.tier,
            estimated_cost: estimate_cost(&request.input_text, chosen),
            was_rerouted,
            reason,
        }
    }
}

/// Estimate cost from a token-count heuristic (`len/4` characters per
/// token) against the candidate's input unit rate, ignoring output tokens
/// entirely, mirroring the proxy path's pre-flight budget estimate.
fn estimate_cost(input_text: &str, model: &ModelInfo) -> Decimal {
    let estimated_tokens = (input_text.chars().count() / 4) as u64;
    let million = Decimal::from(1_000_000u32);
    Decimal::from(estimated_tokens) / million * model.input_per_million
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;
    use cerebra_core::ProviderKind;
    use rust_decimal_macros::dec;

    fn seeded_registry() -> ModelRegistry {
        ModelRegistry::new(vec![
            ModelInfo {
                provider: ProviderKind::OpenAI,
                model: "gpt-4o-mini".to_string(),
                tier: ModelTier::Economy,
                quality_score: 0.6,
                avg_latency_ms: 400.0,
                input_per_million: dec!(0.15),
                output_per_million: dec!(0.60),
                success_rate: 1.0,
            },
            ModelInfo {
                provider: ProviderKind::OpenAI,
                model: "gpt-4o".to_string(),
                tier: ModelTier::Standard,
                quality_score: 0.85,
                avg_latency_ms: 700.0,
                input_per_million: dec!(2.50),
                output_per_million: dec!(10.0),
                success_rate: 1.0,
            },
            ModelInfo {
                provider: ProviderKind::Anthropic,
                model: "claude-3-opus".to_string(),
                tier: ModelTier::Premium,
                quality_score: 0.97,
                avg_latency_ms: 1200.0,
                input_per_million: dec!(15.0),
                output_per_million: dec!(75.0),
                success_rate: 1.0,
            },
        ])
    }

    #[test]
    fn honors_explicit_model_with_no_tier_override() {
        let router = Router::new(seeded_registry());
        let request = RouteRequest {
            original_provider: Some(ProviderKind::OpenAI),
            original_model: Some("gpt-4o".to_string()),
            preferred_tier: None,
            preferred_provider: None,
            input_text: "anything".to_string(),
            has_system_prompt: false,
            max_budget: None,
            strategy: RoutingStrategy::CostOptimized,
        };
        let decision = router.route(&request).unwrap();
        assert_eq!(decision.model, "gpt-4o");
        assert!(!decision.was_rerouted);
    }

    #[test]
    fn trivial_request_routes_to_cheapest_economy_model() {
        let router = Router::new(seeded_registry());
        let request = RouteRequest {
            original_provider: None,
            original_model: None,
            preferred_tier: None,
            preferred_provider: None,
            input_text: "hello".to_string(),
            has_system_prompt: false,
            max_budget: None,
            strategy: RoutingStrategy::CostOptimized,
        };
        let decision = router.route(&request).unwrap();
        assert_eq!(decision.model, "gpt-4o-mini");
        assert!(!decision.was_rerouted);
    }

    #[test]
    fn preferred_tier_overrides_explicit_honoring() {
        let router = Router::new(seeded_registry());
        let request = RouteRequest {
            original_provider: Some(ProviderKind::OpenAI),
            original_model: Some("gpt-4o-mini".to_string()),
            preferred_tier: Some(ModelTier::Premium),
            preferred_provider: None,
            input_text: "please analyze this in detail".to_string(),
            has_system_prompt: false,
            max_budget: None,
            strategy: RoutingStrategy::QualityFirst,
        };
        let decision = router.route(&request).unwrap();
        assert_eq!(decision.model, "claude-3-opus");
        assert!(decision.was_rerouted);
    }
}
