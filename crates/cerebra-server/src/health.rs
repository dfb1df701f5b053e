//! `GET /health` and `GET /ready`.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of `GET /health`: unauthenticated liveness, no dependency
/// checks. If the process can answer this at all, it is alive.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    time: DateTime<Utc>,
}

/// `GET /health`. Never fails: reaching this handler at all is the proof
/// of liveness.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        service: "cerebra-gateway",
        version: env!("CARGO_PKG_VERSION"),
        time: Utc::now(),
    })
}

/// Body of `GET /ready`.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    store: &'static str,
}

/// `GET /ready`: probes the durable store. 200 if reachable, 503
/// otherwise. The fast cache is deliberately not part of this probe —
/// per the budget enforcer's degradation path, a cache outage alone
/// should not take the whole gateway out of rotation.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(ReadinessResponse { status: "ready", store: "ok" })),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse { status: "not_ready", store: "unreachable" }),
        ),
    }
}
