//! The `api_requests` time-series log: inserts from the proxy path, reads
//! from the analytics engine.
//!
//! `created_at` is stored as an RFC3339 UTC string (always `...Z`,
//! fixed-width). That format compares lexicographically in the same order
//! it compares chronologically, which is what lets the range queries below
//! use plain `>=`/`<` against a `TEXT` column identically on Postgres and
//! SQLite through `sqlx::Any` — no dialect-specific date arithmetic needed.

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use cerebra_core::provider::ProviderKind;
use cerebra_core::request_log::ApiRequest;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

/// The dimension analytics queries may group or filter by. Deliberately a
/// closed enum rather than a free-form string: `generate_report` and
/// `top_spenders` select SQL columns by this value, and an open string
/// would make that a SQL-injection surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Group by `agent_id`.
    Agent,
    /// Group by `team_id`.
    Team,
    /// Group by `model`.
    Model,
    /// Group by `provider`.
    Provider,
}

impl Dimension {
    /// Parse from the wire name used in query parameters
    /// (`?dimension=agent`). Rejects anything not in the closed allow-list.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "agent" => Some(Self::Agent),
            "team" => Some(Self::Team),
            "model" => Some(Self::Model),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }

    /// The literal column name this dimension groups by. Never built from
    /// user input directly — only ever reached through [`Dimension::parse`].
    const fn column(self) -> &'static str {
        match self {
            Self::Agent => "agent_id",
            Self::Team => "team_id",
            Self::Model => "model",
            Self::Provider => "provider",
        }
    }
}

/// One row of a `generate_report`/`top_spenders` aggregation.
#[derive(Debug, Clone)]
pub struct CostSummary {
    /// The grouped dimension value (agent id, team id, model, or provider).
    pub key: String,
    /// `SUM(cost)` over the group.
    pub total_cost: Decimal,
    /// `COUNT(*)` over the group.
    pub request_count: i64,
    /// `SUM(total_tokens)` over the group.
    pub total_tokens: i64,
    /// `AVG(latency_ms)` over the group.
    pub avg_latency_ms: f64,
    /// `SUM(savings)` over the group (routed requests only).
    pub total_savings: Decimal,
}

/// A raw usage row, grouped by `(agent_id, team_id, model, provider)`,
/// used by `recommend_model_switches`.
#[derive(Debug, Clone)]
pub struct UsageGroup {
    /// Asserted agent id, if any.
    pub agent_id: Option<String>,
    /// Asserted team id, if any.
    pub team_id: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Upstream provider.
    pub provider: ProviderKind,
    /// Number of requests in this group.
    pub request_count: i64,
    /// Total cost across the group.
    pub total_cost: Decimal,
}

impl Store {
    /// Append a completed request to the durable log. Never mutated or
    /// deleted afterward except by retention policy.
    pub async fn insert_request(&self, request: &ApiRequest) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO api_requests \
             (id, provider, model, agent_id, team_id, org_id, input_tokens, output_tokens, \
              total_tokens, cost, latency_ms, status_code, was_routed, original_model, \
              routed_model, savings, created_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
        )
        .bind(request.id.to_string())
        .bind(request.provider.path_segment())
        .bind(&request.model)
        .bind(&request.agent_id)
        .bind(&request.team_id)
        .bind(&request.org_id)
        .bind(i64::try_from(request.input_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(request.output_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(request.total_tokens).unwrap_or(i64::MAX))
        .bind(request.cost.to_string())
        .bind(i64::try_from(request.latency_ms).unwrap_or(i64::MAX))
        .bind(i64::from(request.status_code))
        .bind(i64::from(request.routing.was_routed))
        .bind(&request.routing.original_model)
        .bind(&request.routing.routed_model)
        .bind(request.routing.savings.map(|s| s.to_string()))
        .bind(request.timestamp.to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Sum of `cost` for one entity (agent or team) within `[since, now)`.
    /// `column` must be `"agent_id"` or `"team_id"` — both literal, never
    /// derived from a request parameter.
    pub async fn sum_cost_since(
        &self,
        column: &'static str,
        entity_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Decimal> {
        // sqlx::Any can't SUM a TEXT-stored decimal across both backends
        // uniformly, so pull the raw costs and sum them in Rust.
        let rows = sqlx::query(&format!(
            "SELECT cost FROM api_requests WHERE {column} = $1 AND created_at >= $2"
        ))
        .bind(entity_id)
        .bind(since.to_rfc3339())
        .fetch_all(self.pool())
        .await?;

        sum_cost_column(rows)
    }

    /// Every `(agent_id, team_id)` pair with at least one request in
    /// `[since, now)`, used by `detect_spikes` to know which entities to
    /// evaluate.
    pub async fn active_entities_since(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<(Option<String>, Option<String>)>> {
        let rows = sqlx::query(
            "SELECT DISTINCT agent_id, team_id FROM api_requests WHERE created_at >= $1",
        )
        .bind(since.to_rfc3339())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| -> StoreResult<_> {
                Ok((row.try_get("agent_id")?, row.try_get("team_id")?))
            })
            .collect()
    }

    /// Group usage by `(agent_id, team_id, model, provider)` within
    /// `[since, now)`, keeping only groups with at least `min_count`
    /// requests. Used by `recommend_model_switches`.
    pub async fn usage_groups_since(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> StoreResult<Vec<UsageGroup>> {
        let rows = sqlx::query(
            "SELECT agent_id, team_id, model, provider, cost FROM api_requests WHERE created_at >= $1",
        )
        .bind(since.to_rfc3339())
        .fetch_all(self.pool())
        .await?;

        use std::collections::HashMap;
        let mut groups: HashMap<(Option<String>, Option<String>, String, String), (i64, Decimal)> =
            HashMap::new();

        for row in rows {
            let agent_id: Option<String> = row.try_get("agent_id")?;
            let team_id: Option<String> = row.try_get("team_id")?;
            let model: String = row.try_get("model")?;
            let provider: String = row.try_get("provider")?;
            let cost: String = row.try_get("cost")?;
            let cost = Decimal::from_str(&cost).map_err(|e| StoreError::Decode(e.to_string()))?;

            let entry = groups
                .entry((agent_id, team_id, model, provider))
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += cost;
        }

        groups
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_count)
            .map(|((agent_id, team_id, model, provider), (request_count, total_cost))| {
                Ok(UsageGroup {
                    agent_id,
                    team_id,
                    model,
                    provider: provider
                        .parse()
                        .map_err(|()| StoreError::Decode(format!("unknown provider {provider:?}")))?,
                    request_count,
                    total_cost,
                })
            })
            .collect()
    }

    /// `generate_report`/`top_spenders` aggregation: group by `dimension`
    /// within `[from, to)`, ordered by total cost descending, limited to
    /// `limit` rows (the report caller uses 100; `top_spenders` passes its
    /// own limit through).
    pub async fn cost_summary(
        &self,
        dimension: Dimension,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<CostSummary>> {
        let column = dimension.column();
        let rows = sqlx::query(&format!(
            "SELECT {column} as dim, cost, total_tokens, latency_ms, savings FROM api_requests \
             WHERE created_at >= $1 AND created_at < $2"
        ))
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(self.pool())
        .await?;

        use std::collections::HashMap;
        #[derive(Default)]
        struct Acc {
            total_cost: Decimal,
            request_count: i64,
            total_tokens: i64,
            latency_sum: f64,
            total_savings: Decimal,
        }
        let mut accs: HashMap<String, Acc> = HashMap::new();

        for row in rows {
            let key: Option<String> = row.try_get("dim")?;
            let Some(key) = key else { continue };
            let cost: String = row.try_get("cost")?;
            let cost = Decimal::from_str(&cost).map_err(|e| StoreError::Decode(e.to_string()))?;
            let total_tokens: i64 = row.try_get("total_tokens")?;
            let latency_ms: i64 = row.try_get("latency_ms")?;
            let savings: Option<String> = row.try_get("savings")?;
            let savings = savings
                .map(|s| Decimal::from_str(&s).map_err(|e| StoreError::Decode(e.to_string())))
                .transpose()?
                .unwrap_or(Decimal::ZERO);

            let acc = accs.entry(key).or_default();
            acc.total_cost += cost;
            acc.request_count += 1;
            acc.total_tokens += total_tokens;
            acc.latency_sum += latency_ms as f64;
            acc.total_savings += savings;
        }

        let mut summaries: Vec<CostSummary> = accs
            .into_iter()
            .map(|(key, acc)| CostSummary {
                key,
                total_cost: acc.total_cost,
                request_count: acc.request_count,
                total_tokens: acc.total_tokens,
                avg_latency_ms: if acc.request_count > 0 {
                    acc.latency_sum / acc.request_count as f64
                } else {
                    0.0
                },
                total_savings: acc.total_savings,
            })
            .collect();

        summaries.sort_by(|a, b| b.total_cost.cmp(&a.total_cost));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

fn sum_cost_column(rows: Vec<sqlx::any::AnyRow>) -> StoreResult<Decimal> {
    let mut total = Decimal::ZERO;
    for row in rows {
        let cost: String = row.try_get("cost")?;
        total += Decimal::from_str(&cost).map_err(|e| StoreError::Decode(e.to_string()))?;
    }
    Ok(total)
}
