//! The analytics engine: spike detection, model-switch recommendations,
//! and cost reporting, all read-only over the durable request log.

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::report::{self, Report};
use crate::switches;
use cerebra_core::{Insight, InsightSeverity, InsightType};
use cerebra_store::{Dimension, Store};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;

/// Fixed deadline applied to every analytics query, so a slow scan never
/// backs up behind the proxy path.
const QUERY_DEADLINE: Duration = Duration::from_secs(30);

/// Minimum request count for a usage group to be eligible for a model
/// switch recommendation.
const MIN_GROUP_REQUESTS: i64 = 10;

/// Lookback window for `recommend_model_switches`.
const RECOMMENDATION_WINDOW_DAYS: i64 = 30;

/// Rows returned per dimension by `generate_report`.
const REPORT_TOP_N: usize = 100;

/// Read-only analytics over the `api_requests` log.
pub struct AnalyticsEngine {
    store: Store,
}

impl AnalyticsEngine {
    /// Build an engine over the given durable store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Detect cost spikes: for every entity active in the last 7 days,
    /// compare its cost over the last `lookback_hours` against its average
    /// cost per period of that size over the preceding 7 days.
    pub async fn detect_spikes(&self, lookback_hours: i64) -> AnalyticsResult<Vec<Insight>> {
        run(self.detect_spikes_inner(lookback_hours.max(1))).await
    }

    async fn detect_spikes_inner(&self, lookback_hours: i64) -> AnalyticsResult<Vec<Insight>> {
        let now = Utc::now();
        let recent_since = now - ChronoDuration::hours(lookback_hours);
        let baseline_since = now - ChronoDuration::days(7);

        let periods_per_week = (7 * 24 / lookback_hours).max(1);
        let preceding_periods = (periods_per_week - 1).max(1);

        let active = self.store.active_entities_since(baseline_since).await?;
        let mut seen: HashSet<(&'static str, String)> = HashSet::new();
        let mut insights = Vec::new();

        for (agent_id, team_id) in active {
            if let Some(agent_id) = agent_id {
                if seen.insert(("agent_id", agent_id.clone())) {
                    if let Some(insight) = self
                        .evaluate_spike("agent_id", &agent_id, recent_since, baseline_since, preceding_periods)
                        .await?
                    {
                        insights.push(insight);
                    }
                }
            }
            if let Some(team_id) = team_id {
                if seen.insert(("team_id", team_id.clone())) {
                    if let Some(insight) = self
                        .evaluate_spike("team_id", &team_id, recent_since, baseline_since, preceding_periods)
                        .await?
                    {
                        insights.push(insight);
                    }
                }
            }
        }

        Ok(insights)
    }

    async fn evaluate_spike(
        &self,
        column: &'static str,
        entity_id: &str,
        recent_since: DateTime<Utc>,
        baseline_since: DateTime<Utc>,
        preceding_periods: i64,
    ) -> AnalyticsResult<Option<Insight>> {
        let recent_cost = self.store.sum_cost_since(column, entity_id, recent_since).await?;
        let weekly_total = self.store.sum_cost_since(column, entity_id, baseline_since).await?;
        let preceding_cost = (weekly_total - recent_cost).max(Decimal::ZERO);
        let baseline_avg = preceding_cost / Decimal::from(preceding_periods);

        if baseline_avg <= Decimal::ZERO || recent_cost <= baseline_avg * Decimal::from(2) {
            return Ok(None);
        }

        let multiplier = recent_cost / baseline_avg;
        let severity = if multiplier >= Decimal::from(5) { InsightSeverity::Critical } else { InsightSeverity::Warning };
        let estimated_saving = recent_cost - baseline_avg;

        Ok(Some(Insight::new(
            InsightType::CostSpike,
            severity,
            entity_id,
            estimated_saving,
            format!(
                "{entity_id}: recent cost {recent_cost} is {multiplier:.1}x its baseline {baseline_avg} per period"
            ),
        )))
    }

    /// Recommend switching to a cheaper model for high-volume groups still
    /// on a premium model with a known cheaper alternative.
    pub async fn recommend_model_switches(&self) -> AnalyticsResult<Vec<Insight>> {
        run(self.recommend_model_switches_inner()).await
    }

    async fn recommend_model_switches_inner(&self) -> AnalyticsResult<Vec<Insight>> {
        let since = Utc::now() - ChronoDuration::days(RECOMMENDATION_WINDOW_DAYS);
        let groups = self.store.usage_groups_since(since, MIN_GROUP_REQUESTS).await?;

        let mut insights = Vec::new();
        for group in groups {
            let Some(alternative) = switches::cheaper_alternative(&group.model) else { continue };
            let entity = group.agent_id.clone().or_else(|| group.team_id.clone()).unwrap_or_else(|| "unknown".to_string());
            let estimated_saving = group.total_cost * switches::ESTIMATED_SAVINGS_FRACTION;

            insights.push(Insight::new(
                InsightType::ModelSwitch,
                InsightSeverity::Info,
                entity,
                estimated_saving,
                format!(
                    "{} requests on {} ({}) cost {}; switching to {alternative} could save about {estimated_saving} ({}% estimated)",
                    group.request_count,
                    group.model,
                    group.provider,
                    group.total_cost,
                    (switches::ESTIMATED_SAVINGS_FRACTION * Decimal::from(100)),
                ),
            ));
        }

        Ok(insights)
    }

    /// Emit per-dimension cost summaries for `[from, to)`, top 100 each,
    /// ordered by cost descending.
    pub async fn generate_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AnalyticsResult<Report> {
        run(self.generate_report_inner(from, to)).await
    }

    async fn generate_report_inner(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AnalyticsResult<Report> {
        let by_agent = self.store.cost_summary(Dimension::Agent, from, to, REPORT_TOP_N).await?;
        let by_team = self.store.cost_summary(Dimension::Team, from, to, REPORT_TOP_N).await?;
        let by_model = self.store.cost_summary(Dimension::Model, from, to, REPORT_TOP_N).await?;
        let by_provider = self.store.cost_summary(Dimension::Provider, from, to, REPORT_TOP_N).await?;

        Ok(Report {
            by_agent: report::rows(by_agent),
            by_team: report::rows(by_team),
            by_model: report::rows(by_model),
            by_provider: report::rows(by_provider),
        })
    }

    /// Top spenders for a single dimension since `since`, limited to
    /// `limit` rows.
    pub async fn top_spenders(
        &self,
        dimension: Dimension,
        limit: usize,
        since: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<report::CostSummaryRow>> {
        run(async {
            let summaries = self.store.cost_summary(dimension, since, Utc::now(), limit).await?;
            Ok(report::rows(summaries))
        })
        .await
    }
}

async fn run<T>(future: impl std::future::Future<Output = AnalyticsResult<T>>) -> AnalyticsResult<T> {
    timeout(QUERY_DEADLINE, future).await.map_err(|_| AnalyticsError::DeadlineExceeded)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerebra_core::request_log::ApiRequest;
    use cerebra_core::ProviderKind;
    use cerebra_migrations::DatabaseType;
    use rust_decimal_macros::dec;
    use sqlx::any::AnyPoolOptions;

    async fn test_store() -> Store {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        for migration in cerebra_migrations::schema::all_migrations() {
            sqlx::query(&migration.up_sql).execute(&pool).await.unwrap();
        }
        Store::from_pool(pool, DatabaseType::SQLite)
    }

    fn request(agent_id: &str, model: &str, cost: Decimal, created_at: DateTime<Utc>) -> ApiRequest {
        let mut req = ApiRequest::new(
            ProviderKind::OpenAI,
            model,
            Some(agent_id.to_string()),
            None,
            None,
            100,
            50,
            cost,
            400,
            200,
        );
        req.timestamp = created_at;
        req
    }

    #[tokio::test]
    async fn recommend_model_switches_flags_premium_usage() {
        let store = test_store().await;
        let engine = AnalyticsEngine::new(store.clone());
        let now = Utc::now();
        for _ in 0..12 {
            store.insert_request(&request("agent-1", "gpt-4-turbo", dec!(0.50), now)).await.unwrap();
        }

        let insights = engine.recommend_model_switches().await.unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_type, InsightType::ModelSwitch);
    }

    #[tokio::test]
    async fn recommend_model_switches_ignores_low_volume_groups() {
        let store = test_store().await;
        let engine = AnalyticsEngine::new(store.clone());
        let now = Utc::now();
        for _ in 0..3 {
            store.insert_request(&request("agent-1", "gpt-4-turbo", dec!(0.50), now)).await.unwrap();
        }

        let insights = engine.recommend_model_switches().await.unwrap();
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn generate_report_groups_by_model() {
        let store = test_store().await;
        let engine = AnalyticsEngine::new(store.clone());
        let now = Utc::now();
        store.insert_request(&request("agent-1", "gpt-4o", dec!(1.00), now)).await.unwrap();
        store.insert_request(&request("agent-2", "gpt-4o", dec!(2.00), now)).await.unwrap();

        let report = engine.generate_report(now - ChronoDuration::hours(1), now + ChronoDuration::hours(1)).await.unwrap();
        assert_eq!(report.by_model.len(), 1);
        assert_eq!(report.by_model[0].request_count, 2);
    }
}
