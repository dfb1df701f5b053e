//! Cache key naming conventions.
//!
//! Centralized here so the budget enforcer and rate limiter never
//! construct ad hoc key strings that could silently drift apart between
//! read and write sites.

use cerebra_core::BudgetScope;

/// Key under which a budget's running spend for the current period is
/// accumulated.
#[must_use]
pub fn budget_spend_key(scope: BudgetScope, entity_id: &str) -> String {
    format!("budget:spend:{scope}:{entity_id}")
}

/// Key for the fixed-window request counter used by rate limiting.
#[must_use]
pub fn rate_limit_key(entity_id: &str, window_start_secs: u64) -> String {
    format!("rate:{entity_id}:{window_start_secs}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_key_is_scoped_and_stable() {
        assert_eq!(
            budget_spend_key(BudgetScope::Agent, "agent-42"),
            "budget:spend:agent:agent-42"
        );
    }

    #[test]
    fn rate_limit_key_includes_window() {
        assert_eq!(rate_limit_key("agent-42", 1700000000), "rate:agent-42:1700000000");
    }
}
