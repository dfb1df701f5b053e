//! In-memory pricing table: `(provider, model) -> ModelPricing`.
//!
//! Read-mostly and shared by the budget enforcer and the smart router.
//! Per the shared-resource policy, it is never locked for reads — it is
//! constructed once at startup and replaced wholesale by an atomic
//! pointer swap whenever pricing is refreshed from the durable store.

use crate::model::ModelPricing;
use crate::provider::ProviderKind;
use arc_swap::ArcSwap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

type Key = (ProviderKind, String);

/// The fallback rate applied when a model's pricing is unknown, quoted as
/// USD per 1,000,000 tokens. Documented as conservative: $3/M is above
/// most economy-tier models' real input cost.
pub const UNKNOWN_MODEL_FALLBACK_PER_MILLION: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// Read-mostly pricing table, safe to share across every request without
/// per-lookup locking.
pub struct PricingTable {
    inner: ArcSwap<HashMap<Key, ModelPricing>>,
}

impl PricingTable {
    /// Build a table from a snapshot of pricing rows (typically loaded
    /// from the durable store at startup).
    #[must_use]
    pub fn new(rows: Vec<ModelPricing>) -> Self {
        let map = rows
            .into_iter()
            .map(|row| ((row.provider, row.model.clone()), row))
            .collect();
        Self {
            inner: ArcSwap::from_pointee(map),
        }
    }

    /// Replace the entire table with a fresh snapshot. Lock-free for
    /// concurrent readers: in-flight `get` calls see either the old or the
    /// new map in full, never a partial one.
    pub fn refresh(&self, rows: Vec<ModelPricing>) {
        let map = rows
            .into_iter()
            .map(|row| ((row.provider, row.model.clone()), row))
            .collect();
        self.inner.store(Arc::new(map));
    }

    /// Look up pricing for a single model.
    #[must_use]
    pub fn get(&self, provider: ProviderKind, model: &str) -> Option<ModelPricing> {
        self.inner.load().get(&(provider, model.to_string())).cloned()
    }

    /// Input unit cost for a model, or the conservative fallback rate if
    /// unknown.
    #[must_use]
    pub fn input_rate_or_fallback(&self, provider: ProviderKind, model: &str) -> Decimal {
        self.get(provider, model)
            .map_or(UNKNOWN_MODEL_FALLBACK_PER_MILLION, |p| p.input_per_million)
    }

    /// Compute cost for a request, or `Decimal::ZERO` if pricing is
    /// unknown (the caller is responsible for logging the unknown model
    /// once, per the design's "log once per unknown model" rule).
    #[must_use]
    pub fn cost_or_zero(
        &self,
        provider: ProviderKind,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Decimal {
        self.get(provider, model)
            .map_or(Decimal::ZERO, |p| p.cost(input_tokens, output_tokens))
    }

    /// Number of priced models currently in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pricing(model: &str, input: Decimal, output: Decimal) -> ModelPricing {
        ModelPricing {
            provider: ProviderKind::OpenAI,
            model: model.to_string(),
            input_per_million: input,
            output_per_million: output,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_model_falls_back() {
        let table = PricingTable::new(vec![]);
        assert_eq!(
            table.input_rate_or_fallback(ProviderKind::OpenAI, "nonexistent"),
            UNKNOWN_MODEL_FALLBACK_PER_MILLION
        );
        assert_eq!(table.cost_or_zero(ProviderKind::OpenAI, "nonexistent", 100, 50), Decimal::ZERO);
    }

    #[test]
    fn known_model_computes_cost() {
        let table = PricingTable::new(vec![pricing("gpt-4o-mini", dec!(0.15), dec!(0.60))]);
        assert_eq!(table.cost_or_zero(ProviderKind::OpenAI, "gpt-4o-mini", 100, 50), dec!(0.000045));
    }

    #[test]
    fn refresh_replaces_wholesale() {
        let table = PricingTable::new(vec![pricing("gpt-4o-mini", dec!(0.15), dec!(0.60))]);
        table.refresh(vec![pricing("gpt-4o-mini", dec!(0.30), dec!(1.20))]);
        assert_eq!(
            table.get(ProviderKind::OpenAI, "gpt-4o-mini").unwrap().input_per_million,
            dec!(0.30)
        );
    }
}
