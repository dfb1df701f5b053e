//! The router's model registry: read-mostly catalogue of routable models,
//! updated in place by per-request runtime observations.

use cerebra_core::{ModelInfo, ModelTier, ProviderKind};
use dashmap::DashMap;
use std::sync::Arc;

/// Catalogue of candidate models the router may select from.
///
/// Bulk refresh (loading a new provider/model catalogue) replaces the whole
/// contents; per-request runtime feedback (`record_observation`) mutates a
/// single entry in place via `DashMap`'s internal sharding, so the hot
/// feedback path never contends with readers of other models.
#[derive(Clone)]
pub struct ModelRegistry {
    entries: Arc<DashMap<(ProviderKind, String), ModelInfo>>,
}

impl ModelRegistry {
    /// Build a registry from an initial catalogue.
    #[must_use]
    pub fn new(models: Vec<ModelInfo>) -> Self {
        let entries = DashMap::new();
        for model in models {
            entries.insert((model.provider, model.model.clone()), model);
        }
        Self { entries: Arc::new(entries) }
    }

    /// Replace the entire catalogue, discarding prior runtime metrics for
    /// models no longer present.
    pub fn refresh(&self, models: Vec<ModelInfo>) {
        self.entries.clear();
        for model in models {
            self.entries.insert((model.provider, model.model.clone()), model);
        }
    }

    /// Look up a single model by (provider, model id).
    #[must_use]
    pub fn get(&self, provider: ProviderKind, model: &str) -> Option<ModelInfo> {
        self.entries.get(&(provider, model.to_string())).map(|entry| entry.clone())
    }

    /// All candidates at or above `minimum_tier`, optionally restricted to
    /// one provider.
    #[must_use]
    pub fn candidates(&self, minimum_tier: ModelTier, provider: Option<ProviderKind>) -> Vec<ModelInfo> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|model| model.tier >= minimum_tier)
            .filter(|model| provider.map_or(true, |p| p == model.provider))
            .collect()
    }

    /// All known candidates regardless of tier, for the cheapest-overall
    /// fallback when tier filtering empties the set.
    #[must_use]
    pub fn all(&self, provider: Option<ProviderKind>) -> Vec<ModelInfo> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|model| provider.map_or(true, |p| p == model.provider))
            .collect()
    }

    /// Feed a completed proxied request's outcome back into the model's
    /// running latency EMA and success rate.
    pub fn record_observation(&self, provider: ProviderKind, model: &str, latency_ms: f64, success: bool) {
        if let Some(mut entry) = self.entries.get_mut(&(provider, model.to_string())) {
            entry.record_observation(latency_ms, success);
        }
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every registered model, for the `/v1/router/models` listing.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ModelInfo> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn model(provider: ProviderKind, name: &str, tier: ModelTier) -> ModelInfo {
        ModelInfo {
            provider,
            model: name.to_string(),
            tier,
            quality_score: 0.5,
            avg_latency_ms: 500.0,
            input_per_million: dec!(1),
            output_per_million: dec!(2),
            success_rate: 1.0,
        }
    }

    #[test]
    fn candidates_filters_by_tier_and_provider() {
        let registry = ModelRegistry::new(vec![
            model(ProviderKind::OpenAI, "gpt-4o-mini", ModelTier::Economy),
            model(ProviderKind::OpenAI, "gpt-4o", ModelTier::Standard),
            model(ProviderKind::Anthropic, "claude-3-5-sonnet", ModelTier::Standard),
        ]);

        let standard_only = registry.candidates(ModelTier::Standard, None);
        assert_eq!(standard_only.len(), 2);

        let openai_only = registry.candidates(ModelTier::Economy, Some(ProviderKind::OpenAI));
        assert_eq!(openai_only.len(), 2);
    }

    #[test]
    fn record_observation_updates_single_entry() {
        let registry = ModelRegistry::new(vec![model(ProviderKind::OpenAI, "gpt-4o", ModelTier::Standard)]);
        registry.record_observation(ProviderKind::OpenAI, "gpt-4o", 1200.0, true);
        let updated = registry.get(ProviderKind::OpenAI, "gpt-4o").unwrap();
        assert!(updated.avg_latency_ms > 500.0);
    }

    #[test]
    fn refresh_replaces_contents() {
        let registry = ModelRegistry::new(vec![model(ProviderKind::OpenAI, "gpt-4o", ModelTier::Standard)]);
        registry.refresh(vec![model(ProviderKind::Gemini, "gemini-1.5-pro", ModelTier::Premium)]);
        assert!(registry.get(ProviderKind::OpenAI, "gpt-4o").is_none());
        assert_eq!(registry.len(), 1);
    }
}
