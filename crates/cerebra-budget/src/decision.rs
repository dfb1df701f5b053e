//! Outcomes of a budget check, and the alerts a spend commit can fire.

use cerebra_core::BudgetScope;
use rust_decimal::Decimal;

/// Result of [`crate::BudgetEnforcer::check_budget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Allow,
    /// The request must be rejected; details name the scope/entity that
    /// denied it.
    Deny(Denial),
}

impl Decision {
    /// `true` for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Why a [`Decision::Deny`] was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// The scope that denied the request.
    pub scope: BudgetScope,
    /// The entity id within that scope.
    pub entity_id: String,
    /// The specific reason.
    pub reason: DenialReason,
}

/// The specific condition that caused a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// `spent + estimated_cost > limit`.
    LimitExceeded {
        /// The configured limit.
        limit: Decimal,
        /// Spend observed at check time (before this request's cost).
        spent: Decimal,
        /// This request's estimated cost.
        estimated_cost: Decimal,
    },
    /// Neither the cache nor the durable store could be reached, and the
    /// enforcer is configured to fail closed in that case.
    DependencyUnavailable,
}

/// An alert threshold that newly fired on a `record_spend` call. Emitted
/// for {80, 90, 95, 100} percent of a budget's limit, at most once per
/// threshold per billing period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFired {
    /// The scope of the budget that crossed a threshold.
    pub scope: BudgetScope,
    /// The entity id within that scope.
    pub entity_id: String,
    /// The threshold crossed, as a percentage (80, 90, 95, or 100).
    pub threshold_percent: Decimal,
    /// Spend at the time the threshold fired.
    pub spent: Decimal,
    /// The budget's limit.
    pub limit: Decimal,
}
