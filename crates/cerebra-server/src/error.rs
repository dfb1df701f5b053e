//! Maps every error kind that can surface on the request path to an HTTP
//! response, per the gateway's error handling design: the upstream's own
//! status and body are relayed verbatim and never touch this type — this
//! is only for errors the gateway itself raises before or around the
//! upstream call.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cerebra_budget::{Denial, DenialReason};
use serde::Serialize;

/// An error response the gateway itself produced.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status to send.
    pub status: StatusCode,
    /// Machine-readable error kind, mirrors `GatewayError::kind()`.
    pub kind: &'static str,
    /// Human-readable detail.
    pub message: String,
    /// Extra structured fields merged into the body (e.g. the denied
    /// scope/entity for a budget rejection).
    pub extra: Option<serde_json::Value>,
}

impl ApiError {
    /// Build a plain error with no extra fields.
    #[must_use]
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into(), extra: None }
    }

    /// 400, validation failure: bad URL shape, unparseable JSON body, an
    /// out-of-range query parameter.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation", message)
    }

    /// 401, missing or invalid API key.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication", message)
    }

    /// 429, fixed-window rate limit exceeded.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
    }

    /// 502, the upstream dial or I/O failed outright (not a malformed
    /// response — that case is non-fatal and relayed as-is).
    #[must_use]
    pub fn upstream_network(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_network", message)
    }

    /// 503, a required dependency (durable store, cache) is unreachable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }

    /// 500, anything uncaught.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    /// 429 with a machine-readable body naming the scope and entity that
    /// denied the request.
    #[must_use]
    pub fn budget_denied(denial: &Denial) -> Self {
        let (message, extra) = match &denial.reason {
            DenialReason::LimitExceeded { limit, spent, estimated_cost } => (
                format!(
                    "budget exceeded for {} {}: spent {spent} + estimated {estimated_cost} > limit {limit}",
                    denial.scope, denial.entity_id
                ),
                serde_json::json!({
                    "scope": denial.scope.as_str(),
                    "entity_id": denial.entity_id,
                    "limit_usd": limit.to_string(),
                    "spent_usd": spent.to_string(),
                    "estimated_cost_usd": estimated_cost.to_string(),
                }),
            ),
            DenialReason::DependencyUnavailable => (
                format!("budget check unavailable for {} {}", denial.scope, denial.entity_id),
                serde_json::json!({
                    "scope": denial.scope.as_str(),
                    "entity_id": denial.entity_id,
                }),
            ),
        };
        Self { status: StatusCode::TOO_MANY_REQUESTS, kind: "budget_exceeded", message, extra: Some(extra) }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    extra: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.kind, message: &self.message, extra: self.extra.clone() };
        (self.status, Json(body)).into_response()
    }
}

impl From<cerebra_store::StoreError> for ApiError {
    fn from(error: cerebra_store::StoreError) -> Self {
        Self::internal(error.to_string())
    }
}
