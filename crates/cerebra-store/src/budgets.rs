//! Budget storage. `cerebra-budget` is the only caller that should mutate
//! `spent_usd`; this module just does the I/O.

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use cerebra_core::budget::{Budget, BudgetScope};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

impl Store {
    /// Create a budget, or update its limit/period if one already exists
    /// for this `(scope, entity_id)`. Does not touch `spent_usd`.
    pub async fn upsert_budget(
        &self,
        scope: BudgetScope,
        entity_id: &str,
        limit_usd: Decimal,
        period: chrono::Duration,
    ) -> StoreResult<Budget> {
        if let Some(existing) = self.get_budget(scope, entity_id).await? {
            sqlx::query(
                "UPDATE budgets SET limit_usd = $1, period_seconds = $2, updated_at = $3 \
                 WHERE scope = $4 AND entity_id = $5",
            )
            .bind(limit_usd.to_string())
            .bind(period.num_seconds())
            .bind(Utc::now().to_rfc3339())
            .bind(scope.as_str())
            .bind(entity_id)
            .execute(self.pool())
            .await?;
            return Ok(Budget {
                limit_usd,
                period,
                updated_at: Utc::now(),
                ..existing
            });
        }

        let budget = Budget {
            id: uuid::Uuid::new_v4(),
            scope,
            entity_id: entity_id.to_string(),
            limit_usd,
            spent_usd: Decimal::ZERO,
            period,
            alerts_sent: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO budgets \
             (id, scope, entity_id, limit_usd, spent_usd, period_seconds, alerts_sent, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(budget.id.to_string())
        .bind(budget.scope.as_str())
        .bind(&budget.entity_id)
        .bind(budget.limit_usd.to_string())
        .bind(budget.spent_usd.to_string())
        .bind(budget.period.num_seconds())
        .bind("[]")
        .bind(budget.created_at.to_rfc3339())
        .bind(budget.updated_at.to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(budget)
    }

    /// Fetch a single budget by scope and entity.
    pub async fn get_budget(&self, scope: BudgetScope, entity_id: &str) -> StoreResult<Option<Budget>> {
        let row = sqlx::query(
            "SELECT id, scope, entity_id, limit_usd, spent_usd, period_seconds, alerts_sent, \
             created_at, updated_at FROM budgets WHERE scope = $1 AND entity_id = $2",
        )
        .bind(scope.as_str())
        .bind(entity_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(row_to_budget).transpose()
    }

    /// List every budget in the store.
    pub async fn list_budgets(&self) -> StoreResult<Vec<Budget>> {
        let rows = sqlx::query(
            "SELECT id, scope, entity_id, limit_usd, spent_usd, period_seconds, alerts_sent, \
             created_at, updated_at FROM budgets ORDER BY scope, entity_id",
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(row_to_budget).collect()
    }

    /// Maximum compare-and-swap attempts for [`Store::record_spend_durable`]
    /// before giving up and returning [`StoreError::Contention`].
    const RECORD_SPEND_MAX_ATTEMPTS: u32 = 20;

    /// Additively record `amount` of spend against a budget's durable
    /// `spent_usd`. `spent_usd` is stored as `TEXT` (see module docs on
    /// `Decimal`-as-string) so there is no portable `spent_usd = spent_usd
    /// + $1` server-side expression across Postgres and SQLite, and
    /// `SELECT ... FOR UPDATE` isn't valid SQLite syntax — so this
    /// compare-and-swaps instead: read the current value, then update only
    /// if it hasn't changed underneath us, retrying on the rare race. This
    /// is what actually makes the increment atomic; the fast cache (see
    /// `cerebra-cache`) is what gives the hot path its speed, not this path.
    ///
    /// Returns the budget's fresh state after the increment, or `None` if
    /// no budget row exists yet for this scope/entity (nothing to update).
    pub async fn record_spend_durable(
        &self,
        scope: BudgetScope,
        entity_id: &str,
        amount: Decimal,
    ) -> StoreResult<Option<Budget>> {
        for _ in 0..Self::RECORD_SPEND_MAX_ATTEMPTS {
            let row = sqlx::query(
                "SELECT id, scope, entity_id, limit_usd, spent_usd, period_seconds, alerts_sent, \
                 created_at, updated_at FROM budgets WHERE scope = $1 AND entity_id = $2",
            )
            .bind(scope.as_str())
            .bind(entity_id)
            .fetch_optional(self.pool())
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            let previous_spent = row.try_get::<String, _>("spent_usd")?;
            let mut budget = row_to_budget(row)?;
            budget.spent_usd += amount;
            budget.updated_at = Utc::now();

            let result = sqlx::query(
                "UPDATE budgets SET spent_usd = $1, updated_at = $2 \
                 WHERE scope = $3 AND entity_id = $4 AND spent_usd = $5",
            )
            .bind(budget.spent_usd.to_string())
            .bind(budget.updated_at.to_rfc3339())
            .bind(scope.as_str())
            .bind(entity_id)
            .bind(previous_spent)
            .execute(self.pool())
            .await?;

            if result.rows_affected() == 1 {
                return Ok(Some(budget));
            }
            // Lost the race to a concurrent writer; reread and retry.
        }

        Err(StoreError::Contention(Self::RECORD_SPEND_MAX_ATTEMPTS))
    }

    /// Latch a threshold as fired for this budget, returning `true` if it
    /// was newly latched (i.e. this call is the one that should send the
    /// alert) and `false` if it had already fired this period.
    pub async fn latch_alert(
        &self,
        scope: BudgetScope,
        entity_id: &str,
        threshold: Decimal,
    ) -> StoreResult<bool> {
        let mut tx = self.pool().begin().await?;
        let row = sqlx::query("SELECT alerts_sent FROM budgets WHERE scope = $1 AND entity_id = $2")
            .bind(scope.as_str())
            .bind(entity_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(false);
        };

        let raw: String = row.try_get("alerts_sent")?;
        let mut thresholds = decode_alerts(&raw)?;
        if thresholds.iter().any(|t| *t == threshold) {
            tx.commit().await?;
            return Ok(false);
        }
        thresholds.push(threshold);

        sqlx::query("UPDATE budgets SET alerts_sent = $1 WHERE scope = $2 AND entity_id = $3")
            .bind(encode_alerts(&thresholds))
            .bind(scope.as_str())
            .bind(entity_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Start a new billing period for every budget: `spent_usd := 0` and
    /// the alerts latch cleared. Cached spend keys are the caller's
    /// responsibility to clear (see `cerebra-budget::enforcer::reset_budgets`).
    pub async fn reset_all_budgets(&self) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE budgets SET spent_usd = $1, alerts_sent = $2, updated_at = $3",
        )
        .bind(Decimal::ZERO.to_string())
        .bind("[]")
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}

fn decode_alerts(raw: &str) -> StoreResult<Vec<Decimal>> {
    let strings: Vec<String> =
        serde_json::from_str(raw).map_err(|e| StoreError::Decode(e.to_string()))?;
    strings
        .iter()
        .map(|s| Decimal::from_str(s).map_err(|e| StoreError::Decode(e.to_string())))
        .collect()
}

fn encode_alerts(thresholds: &[Decimal]) -> String {
    let strings: Vec<String> = thresholds.iter().map(Decimal::to_string).collect();
    serde_json::to_string(&strings).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_budget(row: sqlx::any::AnyRow) -> StoreResult<Budget> {
    let id: String = row.try_get("id")?;
    let scope: String = row.try_get("scope")?;
    let limit_usd: String = row.try_get("limit_usd")?;
    let spent_usd: String = row.try_get("spent_usd")?;
    let period_seconds: i64 = row.try_get("period_seconds")?;
    let alerts_sent: String = row.try_get("alerts_sent")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Budget {
        id: uuid::Uuid::parse_str(&id).map_err(|e| StoreError::Decode(e.to_string()))?,
        scope: scope
            .parse()
            .map_err(|()| StoreError::Decode(format!("unknown budget scope {scope:?}")))?,
        entity_id: row.try_get("entity_id")?,
        limit_usd: Decimal::from_str(&limit_usd).map_err(|e| StoreError::Decode(e.to_string()))?,
        spent_usd: Decimal::from_str(&spent_usd).map_err(|e| StoreError::Decode(e.to_string()))?,
        period: chrono::Duration::seconds(period_seconds),
        alerts_sent: decode_alerts(&alerts_sent)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .with_timezone(&Utc),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .with_timezone(&Utc),
    })
}
