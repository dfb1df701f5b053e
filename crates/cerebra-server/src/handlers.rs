//! Request handlers: the proxy path and the admin/analytics API.

use crate::auth::AuthenticatedEntity;
use crate::error::ApiError;
use crate::extractors::{AttributionHeaders, ClientIp, JsonBody, RawBody, RequestId};
use crate::state::{AppState, BUDGET_CHECK_TIMEOUT, DEFAULT_RATE_LIMIT_PER_MINUTE};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use cerebra_analytics::AnalyticsError;
use cerebra_budget::{Decision, DenialReason};
use cerebra_core::request_log::{ApiRequest, RoutingOutcome};
use cerebra_core::{BudgetScope, ProviderKind};
use cerebra_router::{RouteRequest, RoutingStrategy};
use cerebra_store::Dimension;
use cerebra_telemetry::AuditActor;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Headers stripped before a request is forwarded upstream: hop-by-hop
/// headers and the gateway's own attribution/routing headers, which the
/// upstream provider has no use for.
const STRIPPED_HEADERS: &[&str] =
    &["host", "connection", "x-agent-id", "x-team-id", "x-org-id", "x-route-strategy"];

fn build_upstream_url(provider: ProviderKind, rest: &str, query: Option<&str>) -> String {
    let base = match provider {
        ProviderKind::OpenAI => "https://api.openai.com",
        ProviderKind::Anthropic => "https://api.anthropic.com",
        ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
    };
    match query {
        Some(q) if !q.is_empty() => format!("{base}/{rest}?{q}"),
        _ => format!("{base}/{rest}"),
    }
}

fn filter_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !STRIPPED_HEADERS.contains(&name.as_str().to_ascii_lowercase().as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

/// Best-effort extraction of prompt text across the three providers' wire
/// shapes, used only to drive the router's complexity heuristic — never
/// logged or persisted.
fn extract_input_text(body: &Value) -> String {
    if let Some(messages) = body.get("messages").and_then(Value::as_array) {
        return messages
            .iter()
            .filter_map(|m| m.get("content").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
    }
    if let Some(contents) = body.get("contents").and_then(Value::as_array) {
        return contents
            .iter()
            .filter_map(|c| c.get("parts").and_then(Value::as_array))
            .flatten()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
    }
    body.get("prompt").and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Whether the request carries a system prompt. A full implementation
/// would need a distinct check per provider's wire shape (a `system`
/// role message for OpenAI, a top-level `system` field for Anthropic, a
/// `systemInstruction` for Gemini); this always reports `false`, which
/// only ever under-estimates complexity, never denies service.
fn has_system_prompt(_body: &Value) -> bool {
    false
}

fn estimate_tokens(char_count: usize) -> u64 {
    (char_count / 4) as u64
}

fn fixed_window_start_secs() -> u64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    (now / 60) * 60
}

async fn enforce_rate_limit(state: &AppState, identity: &str, audit_actor: AuditActor) -> Result<(), ApiError> {
    let window_start = fixed_window_start_secs();
    let key = cerebra_cache::rate_limit_key(identity, window_start);

    let count = match state.cache.incr_counter(&key, std::time::Duration::from_secs(60)).await {
        Ok(count) => count,
        Err(error) => {
            warn!(%error, identity, "rate limit cache unavailable, failing open");
            return Ok(());
        }
    };

    if count > DEFAULT_RATE_LIMIT_PER_MINUTE {
        state
            .audit
            .log_rate_limit(audit_actor, identity, DEFAULT_RATE_LIMIT_PER_MINUTE as u32)
            .await;
        return Err(ApiError::rate_limited(format!(
            "rate limit exceeded: {count} requests this window, limit {DEFAULT_RATE_LIMIT_PER_MINUTE}"
        )));
    }

    Ok(())
}

async fn check_budget_with_deadline(
    state: &AppState,
    scope: BudgetScope,
    entity_id: &str,
    estimated_cost: Decimal,
) -> Decision {
    match tokio::time::timeout(BUDGET_CHECK_TIMEOUT, state.budget.check_budget(scope, entity_id, estimated_cost))
        .await
    {
        Ok(decision) => decision,
        Err(_) => {
            warn!(%scope, entity_id, "budget check exceeded its deadline");
            if state.config.budget_fail_open {
                Decision::Allow
            } else {
                Decision::Deny(cerebra_budget::Denial {
                    scope,
                    entity_id: entity_id.to_string(),
                    reason: DenialReason::DependencyUnavailable,
                })
            }
        }
    }
}

fn maybe_route(headers: &HeaderMap, provider: ProviderKind, model: &str, body: &Value) -> Option<RouteRequest> {
    let strategy = headers
        .get("x-route-strategy")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<RoutingStrategy>().ok())?;

    Some(RouteRequest {
        original_provider: Some(provider),
        original_model: Some(model.to_string()),
        preferred_tier: None,
        preferred_provider: Some(provider),
        input_text: extract_input_text(body),
        has_system_prompt: has_system_prompt(body),
        max_budget: None,
        strategy,
    })
}

/// The proxy path: authenticate, rate-limit, parse the model, optionally
/// route, pre-check budgets, forward upstream, extract usage, commit
/// spend, and asynchronously log — in that numbered order.
pub async fn proxy(
    State(state): State<AppState>,
    entity: AuthenticatedEntity,
    _request_id: RequestId,
    client_ip: ClientIp,
    attribution: AttributionHeaders,
    Path((provider_raw, rest)): Path<(String, String)>,
    method: axum::http::Method,
    headers: HeaderMap,
    uri: axum::http::Uri,
    RawBody(body_bytes): RawBody,
) -> Result<Response, ApiError> {
    let audit_actor = {
        let actor = AuditActor::user(entity.entity_id.clone());
        match &client_ip.0 {
            Some(ip) => actor.with_ip(ip.clone()),
            None => actor,
        }
    };

    enforce_rate_limit(&state, &entity.hash_prefix, audit_actor).await?;

    let provider: ProviderKind = provider_raw
        .parse()
        .map_err(|()| ApiError::bad_request(format!("unknown provider {provider_raw:?}")))?;

    let body: Value = serde_json::from_slice(&body_bytes)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))?;
    let requested_model = body
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("request body missing top-level string field `model`"))?
        .to_string();

    let route_request = maybe_route(&headers, provider, &requested_model, &body);

    let (dispatch_model, routing_outcome) = if let Some(route_request) = &route_request {
        match state.router.route(route_request) {
            Some(decision) => {
                let savings = if decision.was_rerouted {
                    let estimated_tokens = estimate_tokens(body_bytes.len());
                    let original_rate = state.pricing.input_rate_or_fallback(provider, &requested_model);
                    let million = Decimal::from(1_000_000u32);
                    let original_cost = Decimal::from(estimated_tokens) / million * original_rate;
                    Some((original_cost - decision.estimated_cost).max(Decimal::ZERO))
                } else {
                    None
                };

                let outcome = RoutingOutcome {
                    was_routed: decision.was_rerouted,
                    original_model: Some(requested_model.clone()),
                    routed_model: Some(decision.model.clone()),
                    savings,
                };
                (decision.model, outcome)
            }
            None => (requested_model.clone(), RoutingOutcome::default()),
        }
    } else {
        (requested_model.clone(), RoutingOutcome::default())
    };

    let estimated_tokens = estimate_tokens(body_bytes.len());
    let estimated_rate = state.pricing.input_rate_or_fallback(provider, &dispatch_model);
    let estimated_cost = Decimal::from(estimated_tokens) / Decimal::from(1_000_000u32) * estimated_rate;

    let scopes = attribution.asserted_scopes();
    for (scope, entity_id) in &scopes {
        let decision = check_budget_with_deadline(&state, *scope, entity_id, estimated_cost).await;
        if let Decision::Deny(denial) = decision {
            state.audit.log_budget_denied(scope.as_str(), entity_id, &estimated_cost.to_string()).await;
            return Err(ApiError::budget_denied(&denial));
        }
    }

    let upstream_url = build_upstream_url(provider, &rest, uri.query());
    let outbound_headers = filter_headers(&headers);

    let mut request_builder = state.http_client.request(method, &upstream_url).body(body_bytes.to_vec());
    for (name, value) in &outbound_headers {
        request_builder = request_builder.header(name, value);
    }

    let started = Instant::now();
    let upstream_response = request_builder
        .send()
        .await
        .map_err(|e| ApiError::upstream_network(format!("upstream request failed: {e}")))?;
    let latency_ms = started.elapsed().as_millis() as u64;

    let status = upstream_response.status();
    let response_headers = upstream_response.headers().clone();
    let response_bytes = upstream_response
        .bytes()
        .await
        .map_err(|e| ApiError::upstream_network(format!("failed to read upstream response: {e}")))?;

    let (input_tokens, output_tokens, _total_tokens) = extract_usage(provider, &response_bytes);
    let cost = state.pricing.cost_or_zero(provider, &dispatch_model, input_tokens, output_tokens);

    state.router.registry().record_observation(provider, &dispatch_model, latency_ms as f64, status.is_success());

    for (scope, entity_id) in &scopes {
        match state.budget.record_spend(*scope, entity_id, cost).await {
            Ok(alerts) => {
                for alert in alerts {
                    state
                        .audit
                        .log_budget_alert(alert.scope.as_str(), &alert.entity_id, &alert.threshold_percent.to_string())
                        .await;
                }
            }
            Err(error) => warn!(%error, %scope, entity_id, "failed to record spend after proxied request"),
        }
    }

    let api_request = ApiRequest::new(
        provider,
        dispatch_model,
        attribution.agent_id.clone(),
        attribution.team_id.clone(),
        attribution.org_id.clone(),
        input_tokens,
        output_tokens,
        cost,
        latency_ms,
        status.as_u16(),
    )
    .with_routing(routing_outcome);
    state.log_writer.enqueue(api_request);

    let mut response = Response::builder().status(status);
    for (name, value) in response_headers.iter() {
        response = response.header(name, value);
    }
    response
        .body(axum::body::Body::from(response_bytes))
        .map_err(|e| ApiError::internal(format!("failed to build proxied response: {e}")))
}

fn extract_usage(provider: ProviderKind, body_bytes: &[u8]) -> (u64, u64, u64) {
    let Ok(body) = serde_json::from_slice::<Value>(body_bytes) else {
        return (0, 0, 0);
    };

    let as_u64 = |v: Option<&Value>| v.and_then(Value::as_u64).unwrap_or(0);

    match provider {
        ProviderKind::OpenAI => {
            let usage = body.get("usage");
            let input = as_u64(usage.and_then(|u| u.get("prompt_tokens")));
            let output = as_u64(usage.and_then(|u| u.get("completion_tokens")));
            let total = as_u64(usage.and_then(|u| u.get("total_tokens")));
            let total = if total == 0 { input + output } else { total };
            (input, output, total)
        }
        ProviderKind::Anthropic => {
            let usage = body.get("usage");
            let input = as_u64(usage.and_then(|u| u.get("input_tokens")));
            let output = as_u64(usage.and_then(|u| u.get("output_tokens")));
            (input, output, input + output)
        }
        ProviderKind::Gemini => {
            let usage = body.get("usageMetadata");
            let input = as_u64(usage.and_then(|u| u.get("promptTokenCount")));
            let output = as_u64(usage.and_then(|u| u.get("candidatesTokenCount")));
            let total = as_u64(usage.and_then(|u| u.get("totalTokenCount")));
            let total = if total == 0 { input + output } else { total };
            (input, output, total)
        }
    }
}

// --- Budget admin API ---------------------------------------------------

#[derive(Debug, Serialize)]
struct BudgetView {
    scope: String,
    entity_id: String,
    limit_usd: String,
    spent_usd: String,
    remaining_usd: String,
    usage_percent: String,
    is_exhausted: bool,
}

impl From<cerebra_core::Budget> for BudgetView {
    fn from(budget: cerebra_core::Budget) -> Self {
        let status = budget.status();
        Self {
            scope: budget.scope.as_str().to_string(),
            entity_id: budget.entity_id,
            limit_usd: budget.limit_usd.to_string(),
            spent_usd: budget.spent_usd.to_string(),
            remaining_usd: status.remaining.to_string(),
            usage_percent: status.usage_percent.to_string(),
            is_exhausted: status.is_exhausted,
        }
    }
}

pub async fn list_budgets(State(state): State<AppState>) -> Result<Json<Vec<BudgetView>>, ApiError> {
    let budgets = state.store.list_budgets().await?;
    Ok(Json(budgets.into_iter().map(BudgetView::from).collect()))
}

pub async fn get_budget(
    State(state): State<AppState>,
    Path((scope_raw, entity_id)): Path<(String, String)>,
) -> Result<Json<BudgetView>, ApiError> {
    let scope: BudgetScope =
        scope_raw.parse().map_err(|()| ApiError::bad_request(format!("unknown budget scope {scope_raw:?}")))?;
    let budget = state
        .store
        .get_budget(scope, &entity_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "not_found", "no budget for this scope/entity"))?;
    Ok(Json(BudgetView::from(budget)))
}

#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub scope: String,
    pub entity_id: String,
    pub limit_usd: Decimal,
    #[serde(default)]
    pub period_days: Option<i64>,
}

pub async fn create_budget(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<BudgetView>), ApiError> {
    let scope: BudgetScope = request
        .scope
        .parse()
        .map_err(|()| ApiError::bad_request(format!("unknown budget scope {:?}", request.scope)))?;
    let period = chrono::Duration::days(request.period_days.unwrap_or(30));
    let budget = state.store.upsert_budget(scope, &request.entity_id, request.limit_usd, period).await?;
    Ok((StatusCode::CREATED, Json(BudgetView::from(budget))))
}

#[derive(Debug, Serialize)]
pub struct ResetBudgetsResponse {
    pub reset_count: u64,
}

pub async fn reset_budgets(State(state): State<AppState>) -> Result<Json<ResetBudgetsResponse>, ApiError> {
    let reset_count = state.budget.reset_budgets().await?;
    Ok(Json(ResetBudgetsResponse { reset_count }))
}

// --- Analytics admin API -------------------------------------------------

fn analytics_error(error: AnalyticsError) -> ApiError {
    match error {
        AnalyticsError::DeadlineExceeded => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "analytics query exceeded its deadline",
        ),
        AnalyticsError::Store(e) => ApiError::internal(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SpikesQuery {
    #[serde(default = "default_spike_hours")]
    pub hours: i64,
}

const fn default_spike_hours() -> i64 {
    24
}

pub async fn spikes(
    State(state): State<AppState>,
    Query(query): Query<SpikesQuery>,
) -> Result<Json<Vec<cerebra_core::Insight>>, ApiError> {
    let insights = state.analytics.detect_spikes(query.hours).await.map_err(analytics_error)?;
    Ok(Json(insights))
}

pub async fn recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<cerebra_core::Insight>>, ApiError> {
    let insights = state.analytics.recommend_model_switches().await.map_err(analytics_error)?;
    Ok(Json(insights))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: String,
    pub to: String,
}

pub async fn report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<cerebra_analytics::Report>, ApiError> {
    let from = parse_rfc3339(&query.from)?;
    let to = parse_rfc3339(&query.to)?;
    let report = state.analytics.generate_report(from, to).await.map_err(analytics_error)?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TopSpendersQuery {
    pub dimension: String,
    #[serde(default = "default_top_spenders_limit")]
    pub limit: usize,
    pub since: String,
}

const fn default_top_spenders_limit() -> usize {
    10
}

pub async fn top_spenders(
    State(state): State<AppState>,
    Query(query): Query<TopSpendersQuery>,
) -> Result<Json<Vec<cerebra_analytics::CostSummaryRow>>, ApiError> {
    let dimension = Dimension::parse(&query.dimension)
        .ok_or_else(|| ApiError::bad_request(format!("unknown dimension {:?}", query.dimension)))?;
    let since = parse_rfc3339(&query.since)?;
    let rows = state.analytics.top_spenders(dimension, query.limit, since).await.map_err(analytics_error)?;
    Ok(Json(rows))
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::bad_request(format!("invalid RFC3339 timestamp {raw:?}: {e}")))
}

// --- Router admin API -----------------------------------------------------

pub async fn list_models(State(state): State<AppState>) -> Json<Vec<cerebra_core::ModelInfo>> {
    Json(state.router.registry().snapshot())
}

pub async fn route_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RouteRequest>,
) -> Result<Json<cerebra_router::RouteDecision>, ApiError> {
    state
        .router
        .route(&request)
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "no_candidates", "no candidate model satisfies this request"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn openai_usage_extracted_and_total_recomputed_if_missing() {
        let body = serde_json::json!({
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });
        let bytes = serde_json::to_vec(&body).unwrap();
        assert_eq!(extract_usage(ProviderKind::OpenAI, &bytes), (10, 5, 15));
    }

    #[test]
    fn anthropic_usage_computes_total_itself() {
        let body = serde_json::json!({
            "usage": {"input_tokens": 20, "output_tokens": 8}
        });
        let bytes = serde_json::to_vec(&body).unwrap();
        assert_eq!(extract_usage(ProviderKind::Anthropic, &bytes), (20, 8, 28));
    }

    #[test]
    fn gemini_usage_from_usage_metadata() {
        let body = serde_json::json!({
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10}
        });
        let bytes = serde_json::to_vec(&body).unwrap();
        assert_eq!(extract_usage(ProviderKind::Gemini, &bytes), (7, 3, 10));
    }

    #[test]
    fn malformed_body_falls_back_to_zeros() {
        assert_eq!(extract_usage(ProviderKind::OpenAI, b"not json"), (0, 0, 0));
    }

    #[test]
    fn header_stripping_drops_hop_by_hop_and_attribution_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("gateway.local"));
        headers.insert("x-agent-id", HeaderValue::from_static("a1"));
        headers.insert("authorization", HeaderValue::from_static("Bearer sk-upstream"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let filtered = filter_headers(&headers);
        let names: Vec<&str> = filtered.iter().map(|(name, _)| name.as_str()).collect();
        assert!(!names.contains(&"host"));
        assert!(!names.contains(&"x-agent-id"));
        assert!(names.contains(&"authorization"));
        assert!(names.contains(&"content-type"));
    }

    #[test]
    fn upstream_url_includes_query_string() {
        let url = build_upstream_url(ProviderKind::OpenAI, "v1/chat/completions", Some("stream=true"));
        assert_eq!(url, "https://api.openai.com/v1/chat/completions?stream=true");
    }

    #[test]
    fn upstream_url_omits_empty_query() {
        let url = build_upstream_url(ProviderKind::Anthropic, "v1/messages", Some(""));
        assert_eq!(url, "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn input_text_extraction_prefers_messages_array() {
        let body = serde_json::json!({"messages": [{"role": "user", "content": "hello there"}]});
        assert_eq!(extract_input_text(&body), "hello there");
    }
}
