//! Custom Axum extractors shared by the proxy path and the admin API.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Request id: read from `X-Request-ID`/`X-Correlation-ID`/`Request-ID`
/// if the caller supplied one, otherwise generated fresh. Attached to
/// every log line and span for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-request-id")
            .or_else(|| parts.headers.get("x-correlation-id"))
            .or_else(|| parts.headers.get("request-id"))
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        Ok(Self(id))
    }
}

/// Best-effort client IP, from `X-Forwarded-For` (first hop) or
/// `X-Real-IP`. Used as the rate limiter's fallback identity when a
/// request carries no API key.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| parts.headers.get("x-real-ip").and_then(|v| v.to_str().ok()).map(String::from));

        Ok(Self(ip))
    }
}

/// The attribution triple advertised via `X-Agent-ID`/`X-Team-ID`/
/// `X-Org-ID`. An absent or empty header means that scope was not
/// asserted: enforcement and logging at that scope are skipped entirely,
/// rather than treated as an empty-string entity.
#[derive(Debug, Clone, Default)]
pub struct AttributionHeaders {
    /// `X-Agent-ID`, if non-empty.
    pub agent_id: Option<String>,
    /// `X-Team-ID`, if non-empty.
    pub team_id: Option<String>,
    /// `X-Org-ID`, if non-empty.
    pub org_id: Option<String>,
}

impl AttributionHeaders {
    /// Every `(scope, entity)` pair actually asserted by this request.
    #[must_use]
    pub fn asserted_scopes(&self) -> Vec<(cerebra_core::BudgetScope, &str)> {
        let mut scopes = Vec::with_capacity(3);
        if let Some(id) = &self.agent_id {
            scopes.push((cerebra_core::BudgetScope::Agent, id.as_str()));
        }
        if let Some(id) = &self.team_id {
            scopes.push((cerebra_core::BudgetScope::Team, id.as_str()));
        }
        if let Some(id) = &self.org_id {
            scopes.push((cerebra_core::BudgetScope::Org, id.as_str()));
        }
        scopes
    }
}

fn non_empty_header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AttributionHeaders
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            agent_id: non_empty_header(parts, "x-agent-id"),
            team_id: non_empty_header(parts, "x-team-id"),
            org_id: non_empty_header(parts, "x-org-id"),
        })
    }
}

/// Raw request body, read fully into memory and reported as a 400
/// `validation` [`ApiError`] on failure rather than Axum's default
/// rejection. The proxy path needs the body as bytes (to re-send
/// upstream) rather than pre-decoded, unlike [`JsonBody`].
#[derive(Debug)]
pub struct RawBody(pub axum::body::Bytes);

#[async_trait]
impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read request body: {e}")))?;
        Ok(Self(bytes))
    }
}

/// JSON body extractor that reports parse failures as a 400
/// `validation` [`ApiError`] rather than Axum's default rejection.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read request body: {e}")))?;

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "json parse error");
            ApiError::bad_request(format!("invalid JSON: {e}"))
        })?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[tokio::test]
    async fn attribution_headers_treat_empty_as_unasserted() {
        let req = HttpRequest::builder()
            .uri("/test")
            .header("x-agent-id", "")
            .header("x-team-id", "team-9")
            .body(())
            .expect("valid request");
        let (mut parts, _body) = req.into_parts();

        let attribution = AttributionHeaders::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(attribution.agent_id.is_none());
        assert_eq!(attribution.team_id.as_deref(), Some("team-9"));
        assert_eq!(attribution.asserted_scopes().len(), 1);
    }

    #[tokio::test]
    async fn request_id_generated_when_absent() {
        let req = HttpRequest::builder().uri("/test").body(()).expect("valid request");
        let (mut parts, _body) = req.into_parts();

        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.0.len(), 36);
    }

    #[tokio::test]
    async fn request_id_honors_header() {
        let req = HttpRequest::builder().uri("/test").header("x-request-id", "abc-123").body(()).expect("valid");
        let (mut parts, _body) = req.into_parts();

        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.0, "abc-123");
    }
}
