//! Per-strategy candidate selection. Each function is a pure fold over a
//! candidate slice; no shared state between strategies.

use crate::complexity::Complexity;
use cerebra_core::ModelInfo;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Tokens assumed for the `quality_first` reference workload, split evenly
/// between input and output.
const REFERENCE_WORKLOAD_TOKENS: u64 = 10_000;

/// Select the candidate with the lowest input unit cost.
#[must_use]
pub fn cost_optimized(candidates: &[ModelInfo]) -> Option<&ModelInfo> {
    candidates.iter().min_by(|a, b| a.input_per_million.cmp(&b.input_per_million))
}

/// Select the highest-quality candidate, respecting `max_budget` against the
/// reference workload if given.
#[must_use]
pub fn quality_first<'a>(candidates: &'a [ModelInfo], max_budget: Option<Decimal>) -> Option<&'a ModelInfo> {
    let mut ranked: Vec<&ModelInfo> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap_or(std::cmp::Ordering::Equal));

    let Some(budget) = max_budget else {
        return ranked.into_iter().next();
    };

    ranked
        .into_iter()
        .find(|model| model.cost(REFERENCE_WORKLOAD_TOKENS / 2, REFERENCE_WORKLOAD_TOKENS / 2) <= budget)
}

/// Select the candidate with the lowest observed average latency.
#[must_use]
pub fn latency_optimized(candidates: &[ModelInfo]) -> Option<&ModelInfo> {
    candidates
        .iter()
        .min_by(|a, b| a.avg_latency_ms.partial_cmp(&b.avg_latency_ms).unwrap_or(std::cmp::Ordering::Equal))
}

/// Weighted blend of cost, quality, and latency, tuned per complexity
/// bucket and penalized by each candidate's observed error rate.
#[must_use]
pub fn adaptive(candidates: &[ModelInfo], complexity: Complexity) -> Option<&ModelInfo> {
    if candidates.is_empty() {
        return None;
    }

    let (w_cost, w_quality, w_latency) = match complexity {
        Complexity::Low => (0.6, 0.1, 0.3),
        Complexity::Medium => (0.3, 0.4, 0.3),
        Complexity::High => (0.1, 0.7, 0.2),
    };

    let costs: Vec<f64> = candidates.iter().map(|m| m.input_per_million.to_f64().unwrap_or(0.0)).collect();
    let latencies: Vec<f64> = candidates.iter().map(|m| m.avg_latency_ms).collect();

    let (cost_min, cost_max) = min_max(&costs);
    let (lat_min, lat_max) = min_max(&latencies);

    let mut best_index = 0;
    let mut best_score = f64::MIN;

    for (index, model) in candidates.iter().enumerate() {
        let cost_norm = normalize(costs[index], cost_min, cost_max);
        let lat_norm = normalize(latencies[index], lat_min, lat_max);
        let raw = w_cost * (1.0 - cost_norm) + w_quality * model.quality_score + w_latency * (1.0 - lat_norm);
        let score = raw * (1.0 - model.error_rate());
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }

    candidates.get(best_index)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerebra_core::{ModelTier, ProviderKind};
    use rust_decimal_macros::dec;

    fn model(name: &str, input_per_million: Decimal, quality: f64, latency: f64) -> ModelInfo {
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: name.to_string(),
            tier: ModelTier::Standard,
            quality_score: quality,
            avg_latency_ms: latency,
            input_per_million,
            output_per_million: input_per_million * dec!(2),
            success_rate: 1.0,
        }
    }

    #[test]
    fn cost_optimized_picks_cheapest() {
        let candidates = vec![model("a", dec!(5), 0.5, 500.0), model("b", dec!(1), 0.4, 600.0)];
        assert_eq!(cost_optimized(&candidates).unwrap().model, "b");
    }

    #[test]
    fn quality_first_ignores_budget_when_none() {
        let candidates = vec![model("a", dec!(5), 0.9, 500.0), model("b", dec!(1), 0.4, 600.0)];
        assert_eq!(quality_first(&candidates, None).unwrap().model, "a");
    }

    #[test]
    fn quality_first_respects_budget() {
        let expensive = model("premium", dec!(50), 0.95, 400.0);
        let cheap = model("cheap", dec!(1), 0.5, 500.0);
        let candidates = vec![expensive, cheap];
        let picked = quality_first(&candidates, Some(dec!(0.01))).unwrap();
        assert_eq!(picked.model, "cheap");
    }

    #[test]
    fn latency_optimized_picks_fastest() {
        let candidates = vec![model("a", dec!(5), 0.5, 900.0), model("b", dec!(1), 0.4, 300.0)];
        assert_eq!(latency_optimized(&candidates).unwrap().model, "b");
    }

    #[test]
    fn adaptive_weights_quality_heavily_for_high_complexity() {
        let candidates = vec![model("cheap-slow", dec!(1), 0.3, 900.0), model("premium-fast", dec!(20), 0.95, 200.0)];
        let picked = adaptive(&candidates, Complexity::High).unwrap();
        assert_eq!(picked.model, "premium-fast");
    }

    #[test]
    fn adaptive_weights_cost_heavily_for_low_complexity() {
        let candidates = vec![model("cheap-slow", dec!(1), 0.3, 900.0), model("premium-fast", dec!(20), 0.95, 200.0)];
        let picked = adaptive(&candidates, Complexity::Low).unwrap();
        assert_eq!(picked.model, "cheap-slow");
    }
}
