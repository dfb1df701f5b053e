//! Budget and budget-status types.
//!
//! [`Budget`] is the durable row; [`BudgetStatus`] is a derived, read-only
//! view computed from it. Mutation of `spent` is the Budget Enforcer's
//! exclusive responsibility (see `cerebra-budget`); this crate only
//! describes the shape of the data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The level at which a spending limit is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetScope {
    /// A single agent.
    Agent,
    /// A team of agents.
    Team,
    /// An individual end user.
    User,
    /// A whole organization.
    Org,
}

impl BudgetScope {
    /// All scopes, in the order the proxy path checks them.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Agent, Self::Team, Self::User, Self::Org]
    }

    /// Lowercase wire name, used as the cache-key and column discriminant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Team => "team",
            Self::User => "user",
            Self::Org => "org",
        }
    }
}

impl fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BudgetScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Self::Agent),
            "team" => Ok(Self::Team),
            "user" => Ok(Self::User),
            "org" => Ok(Self::Org),
            _ => Err(()),
        }
    }
}

/// The four alert thresholds evaluated after every `record_spend`, as a
/// fraction of `limit`.
pub const ALERT_THRESHOLDS: [Decimal; 4] = [
    Decimal::from_parts(80, 0, 0, false, 2),
    Decimal::from_parts(90, 0, 0, false, 2),
    Decimal::from_parts(95, 0, 0, false, 2),
    Decimal::from_parts(100, 0, 0, false, 2),
];

/// A spending limit scoped to one `(scope, entity_id)` pair.
///
/// Invariant: `limit >= 0` and `spent >= 0`. A `limit` of zero means "no
/// enforcement configured" — requests against this budget always pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    /// Durable row id.
    pub id: uuid::Uuid,
    /// Enforcement scope.
    pub scope: BudgetScope,
    /// Entity id within the scope (agent id, team id, user id, or org id).
    pub entity_id: String,
    /// USD spending limit for the period. Zero disables enforcement.
    pub limit_usd: Decimal,
    /// USD spent so far in the current period.
    pub spent_usd: Decimal,
    /// Billing period length.
    pub period: chrono::Duration,
    /// Alert thresholds (of `ALERT_THRESHOLDS`) already fired this period.
    pub alerts_sent: Vec<Decimal>,
    /// When this budget row was created.
    pub created_at: DateTime<Utc>,
    /// When this budget row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Default billing period: 30 days.
    #[must_use]
    pub fn default_period() -> chrono::Duration {
        chrono::Duration::days(30)
    }

    /// Whether enforcement is configured for this budget at all.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.limit_usd > Decimal::ZERO
    }

    /// Derive the read-only [`BudgetStatus`] view.
    #[must_use]
    pub fn status(&self) -> BudgetStatus {
        BudgetStatus::from_budget(self)
    }
}

/// Derived, read-only view over a [`Budget`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    /// `max(0, limit - spent)`.
    pub remaining: Decimal,
    /// `100 * spent / limit`, or zero when `limit == 0`.
    pub usage_percent: Decimal,
    /// `limit > 0 && spent >= limit`.
    pub is_exhausted: bool,
}

impl BudgetStatus {
    /// Compute the status view from a budget's raw `limit_usd`/`spent_usd`.
    #[must_use]
    pub fn from_budget(budget: &Budget) -> Self {
        Self::compute(budget.limit_usd, budget.spent_usd)
    }

    /// Compute the status view directly from limit and spent amounts.
    #[must_use]
    pub fn compute(limit_usd: Decimal, spent_usd: Decimal) -> Self {
        let remaining = (limit_usd - spent_usd).max(Decimal::ZERO);
        let usage_percent = if limit_usd > Decimal::ZERO {
            Decimal::from(100u32) * spent_usd / limit_usd
        } else {
            Decimal::ZERO
        };
        let is_exhausted = limit_usd > Decimal::ZERO && spent_usd >= limit_usd;
        Self {
            remaining,
            usage_percent,
            is_exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_limit_means_unenforced() {
        let status = BudgetStatus::compute(dec!(0), dec!(500));
        assert_eq!(status.usage_percent, dec!(0));
        assert!(!status.is_exhausted);
    }

    #[test]
    fn exhausted_at_exactly_limit() {
        let status = BudgetStatus::compute(dec!(10), dec!(10));
        assert!(status.is_exhausted);
        assert_eq!(status.remaining, dec!(0));
    }

    #[test]
    fn remaining_never_negative() {
        let status = BudgetStatus::compute(dec!(10), dec!(15));
        assert_eq!(status.remaining, dec!(0));
    }

    #[test]
    fn scope_round_trips_through_str() {
        for scope in BudgetScope::all() {
            assert_eq!(scope.as_str().parse::<BudgetScope>().unwrap(), scope);
        }
    }
}
