//! Output of [`crate::Router::route`].

use cerebra_core::{ModelTier, ProviderKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The router's chosen model and the reasoning behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Chosen provider.
    pub provider: ProviderKind,
    /// Chosen model identifier.
    pub model: String,
    /// Chosen model's tier.
    pub tier: ModelTier,
    /// Estimated cost of the request against the chosen model's pricing.
    pub estimated_cost: Decimal,
    /// `true` iff the caller named a model and the router picked a
    /// different one.
    pub was_rerouted: bool,
    /// Human-readable explanation of the decision.
    pub reason: String,
}
