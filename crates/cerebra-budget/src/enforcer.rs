//! The budget enforcer: atomic check-and-commit of spend against a
//! configured limit, across the four scopes (agent, team, user, org).

use crate::decision::{AlertFired, Decision, Denial, DenialReason};
use cerebra_cache::{budget_spend_key, FastCache};
use cerebra_core::budget::ALERT_THRESHOLDS;
use cerebra_core::{Budget, BudgetScope};
use cerebra_store::Store;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// TTL applied to a budget's cached spend key on its first increment of a
/// period: comfortably longer than the default 30-day period so the key
/// never expires mid-period even if traffic is bursty at the boundary.
pub const SPEND_KEY_TTL: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Atomic budget check-and-commit, backed by a fast cache for the hot
/// read/write path and a durable store as the ground truth.
pub struct BudgetEnforcer {
    cache: Arc<dyn FastCache>,
    store: Store,
    /// Whether a check should admit (`true`) or deny (`false`) a request
    /// when neither the cache nor the durable store can be reached.
    fail_open: bool,
}

impl BudgetEnforcer {
    /// Build an enforcer. `fail_open` governs behavior only when the
    /// *durable store itself* is unreachable during a check (the cache
    /// failing alone just falls back to the store's last known spend, per
    /// the design's documented degradation path).
    #[must_use]
    pub fn new(cache: Arc<dyn FastCache>, store: Store, fail_open: bool) -> Self {
        Self { cache, store, fail_open }
    }

    /// `check_budget(scope, entity, estimated_cost)`.
    ///
    /// 1. No budget row, or `limit <= 0`: allow (enforcement not configured).
    /// 2. Read `spent` from the fast cache; on a cache miss or cache error,
    ///    fall back to the durable store's last committed `spent_usd`.
    /// 3. Deny iff `spent + estimated_cost > limit`.
    pub async fn check_budget(
        &self,
        scope: BudgetScope,
        entity_id: &str,
        estimated_cost: Decimal,
    ) -> Decision {
        let budget = match self.store.get_budget(scope, entity_id).await {
            Ok(Some(budget)) => budget,
            Ok(None) => return Decision::Allow,
            Err(error) => {
                warn!(%error, %scope, entity_id, "budget store unavailable during check");
                return self.unavailable_decision(scope, entity_id);
            }
        };

        if !budget.is_enforced() {
            return Decision::Allow;
        }

        let spent = self.read_spent(scope, entity_id, &budget).await;

        if spent + estimated_cost > budget.limit_usd {
            Decision::Deny(Denial {
                scope,
                entity_id: entity_id.to_string(),
                reason: DenialReason::LimitExceeded {
                    limit: budget.limit_usd,
                    spent,
                    estimated_cost,
                },
            })
        } else {
            Decision::Allow
        }
    }

    async fn read_spent(&self, scope: BudgetScope, entity_id: &str, budget: &Budget) -> Decimal {
        let key = budget_spend_key(scope, entity_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match std::str::from_utf8(&raw).ok().and_then(|s| Decimal::from_str(s).ok()) {
                Some(value) => value,
                None => {
                    warn!(%scope, entity_id, "cached spend value corrupt, falling back to durable store");
                    budget.spent_usd
                }
            },
            Ok(None) => budget.spent_usd,
            Err(error) => {
                warn!(%error, %scope, entity_id, "fast cache unavailable, falling back to durable store for spend");
                budget.spent_usd
            }
        }
    }

    fn unavailable_decision(&self, scope: BudgetScope, entity_id: &str) -> Decision {
        if self.fail_open {
            Decision::Allow
        } else {
            Decision::Deny(Denial {
                scope,
                entity_id: entity_id.to_string(),
                reason: DenialReason::DependencyUnavailable,
            })
        }
    }

    /// `record_spend(scope, entity, cost)`.
    ///
    /// Increments both durable and cached spend, additively and
    /// concurrency-safely, then evaluates the {80, 90, 95, 100}% alert
    /// thresholds. Durable-store failures are propagated (the caller
    /// decides whether to retry); cache-update failures are logged and
    /// swallowed, since the durable store remains authoritative and the
    /// cache converges on its next read.
    pub async fn record_spend(
        &self,
        scope: BudgetScope,
        entity_id: &str,
        cost: Decimal,
    ) -> Result<Vec<AlertFired>, cerebra_store::StoreError> {
        let Some(budget) = self.store.record_spend_durable(scope, entity_id, cost).await? else {
            // No budget row for this entity: nothing to track or alert on.
            return Ok(Vec::new());
        };

        let key = budget_spend_key(scope, entity_id);
        if let Err(error) = self.cache.incr_float(&key, cost, SPEND_KEY_TTL).await {
            warn!(%error, %scope, entity_id, "failed to update cached spend after durable commit");
        }

        Ok(self.evaluate_alerts(scope, entity_id, &budget).await)
    }

    async fn evaluate_alerts(&self, scope: BudgetScope, entity_id: &str, budget: &Budget) -> Vec<AlertFired> {
        if budget.limit_usd <= Decimal::ZERO {
            return Vec::new();
        }

        let mut fired = Vec::new();
        let usage_fraction = budget.spent_usd / budget.limit_usd;

        for threshold in ALERT_THRESHOLDS {
            if usage_fraction < threshold {
                continue;
            }
            match self.store.latch_alert(scope, entity_id, threshold).await {
                Ok(true) => fired.push(AlertFired {
                    scope,
                    entity_id: entity_id.to_string(),
                    threshold_percent: threshold * Decimal::from(100u32),
                    spent: budget.spent_usd,
                    limit: budget.limit_usd,
                }),
                Ok(false) => {}
                Err(error) => warn!(%error, %scope, entity_id, "failed to latch budget alert"),
            }
        }
        fired
    }

    /// Start a new billing period: `spent := 0` for every budget in the
    /// durable store, the cached spend keys cleared, and the alerts latch
    /// cleared (each threshold may fire again next period).
    pub async fn reset_budgets(&self) -> Result<u64, cerebra_store::StoreError> {
        let budgets = self.store.list_budgets().await?;
        let count = self.store.reset_all_budgets().await?;

        for budget in budgets {
            let key = budget_spend_key(budget.scope, &budget.entity_id);
            if let Err(error) = self.cache.delete(&key).await {
                warn!(%error, scope = %budget.scope, entity_id = %budget.entity_id, "failed to clear cached spend on reset");
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerebra_cache::MemoryCacheBackend;
    use cerebra_migrations::DatabaseType;
    use rust_decimal_macros::dec;
    use sqlx::any::AnyPoolOptions;

    async fn test_store() -> Store {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for migration in cerebra_migrations::schema::all_migrations() {
            sqlx::query(&migration.up_sql).execute(&pool).await.unwrap();
        }
        Store::from_pool(pool, DatabaseType::SQLite)
    }

    fn enforcer(store: Store, fail_open: bool) -> BudgetEnforcer {
        BudgetEnforcer::new(Arc::new(MemoryCacheBackend::new()), store, fail_open)
    }

    #[tokio::test]
    async fn zero_limit_always_allows() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Agent, "a1", Decimal::ZERO, Budget::default_period())
            .await
            .unwrap();
        let enforcer = enforcer(store, false);
        assert_eq!(
            enforcer.check_budget(BudgetScope::Agent, "a1", dec!(1000)).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn no_budget_row_allows() {
        let enforcer = enforcer(test_store().await, false);
        assert_eq!(
            enforcer.check_budget(BudgetScope::Agent, "nobody", dec!(1000)).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn denies_exactly_over_limit() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Team, "t1", dec!(1.00), Budget::default_period())
            .await
            .unwrap();
        store.record_spend_durable(BudgetScope::Team, "t1", dec!(0.999)).await.unwrap();

        let enforcer = enforcer(store, false);
        let decision = enforcer.check_budget(BudgetScope::Team, "t1", dec!(0.002)).await;
        assert!(matches!(decision, Decision::Deny(_)));
    }

    #[tokio::test]
    async fn admits_exactly_at_limit() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Team, "t1", dec!(1.00), Budget::default_period())
            .await
            .unwrap();
        let enforcer = enforcer(store, false);
        assert_eq!(
            enforcer.check_budget(BudgetScope::Team, "t1", dec!(1.00)).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn record_spend_is_additive() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Agent, "a1", dec!(100), Budget::default_period())
            .await
            .unwrap();
        let enforcer = enforcer(store.clone(), false);
        enforcer.record_spend(BudgetScope::Agent, "a1", dec!(1.5)).await.unwrap();
        enforcer.record_spend(BudgetScope::Agent, "a1", dec!(2.25)).await.unwrap();

        let budget = store.get_budget(BudgetScope::Agent, "a1").await.unwrap().unwrap();
        assert_eq!(budget.spent_usd, dec!(3.75));
    }

    #[tokio::test]
    async fn threshold_fires_once_per_period() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Agent, "a1", dec!(10), Budget::default_period())
            .await
            .unwrap();
        let enforcer = enforcer(store.clone(), false);

        let first = enforcer.record_spend(BudgetScope::Agent, "a1", dec!(8.5)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].threshold_percent, dec!(80));

        let second = enforcer.record_spend(BudgetScope::Agent, "a1", dec!(0.01)).await.unwrap();
        assert!(second.is_empty());

        enforcer.reset_budgets().await.unwrap();
        store.upsert_budget(BudgetScope::Agent, "a1", dec!(10), Budget::default_period()).await.unwrap();
        let after_reset = enforcer.record_spend(BudgetScope::Agent, "a1", dec!(8.5)).await.unwrap();
        assert_eq!(after_reset.len(), 1);
    }

    #[tokio::test]
    async fn reset_zeroes_spend() {
        let store = test_store().await;
        store
            .upsert_budget(BudgetScope::Org, "o1", dec!(50), Budget::default_period())
            .await
            .unwrap();
        let enforcer = enforcer(store.clone(), false);
        enforcer.record_spend(BudgetScope::Org, "o1", dec!(10)).await.unwrap();
        enforcer.reset_budgets().await.unwrap();

        let budget = store.get_budget(BudgetScope::Org, "o1").await.unwrap().unwrap();
        assert_eq!(budget.spent_usd, Decimal::ZERO);
    }
}
