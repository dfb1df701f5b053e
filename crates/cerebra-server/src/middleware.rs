//! Request-scoped tracing middleware: wraps every inbound request in a
//! span carrying its request id and logs a single structured line on
//! completion.

use crate::shutdown::{RequestGuard, ShutdownCoordinator};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Attach a request-id span to every request and log method, path,
/// status, and latency once it completes.
pub async fn trace_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let span = info_span!("http_request", %method, %path, request_id = %request_id);
    let started = Instant::now();

    async move {
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

/// Register this request with the shutdown coordinator's in-flight
/// counter so `trigger_shutdown`'s drain wait reflects real traffic, and
/// reject new requests with 503 once shutdown has begun.
pub async fn track_inflight(
    State(coordinator): State<Arc<ShutdownCoordinator>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_guard) = RequestGuard::new(coordinator) else {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    };
    next.run(request).await
}
