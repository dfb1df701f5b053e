//! Route table for the gateway API.

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{auth::AdminAuth, handlers, health, middleware, shutdown::ShutdownCoordinator, state::AppState};

/// Build the full application router: health checks are open and exempt
/// from in-flight tracking (a load balancer must keep seeing them during
/// drain); the proxy path authenticates per-request via its own
/// extractor, and the admin/analytics/router surfaces sit behind
/// [`AdminAuth`]. Everything but `/health`/`/ready` is registered with
/// `coordinator` so graceful shutdown drains real traffic.
pub fn create_router(state: AppState, coordinator: Arc<ShutdownCoordinator>) -> Router {
    let tracked = Router::new()
        .route("/v1/:provider/*rest", any(handlers::proxy))
        .nest("/v1/budgets", budget_routes())
        .nest("/v1/analytics", analytics_routes())
        .nest("/v1/router", router_routes())
        .layer(axum::middleware::from_fn_with_state(coordinator, middleware::track_inflight));

    Router::new()
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .merge(tracked)
        .layer(axum::middleware::from_fn(middleware::trace_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Budget admin endpoints, behind [`AdminAuth`].
fn budget_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_budgets).post(handlers::create_budget))
        .route("/reset", axum::routing::post(handlers::reset_budgets))
        .route("/:scope/:entity_id", get(handlers::get_budget))
        .layer(axum::middleware::from_extractor::<AdminAuth>())
}

/// Read-only cost analytics endpoints, behind [`AdminAuth`].
fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/spikes", get(handlers::spikes))
        .route("/recommendations", get(handlers::recommendations))
        .route("/report", get(handlers::report))
        .route("/top-spenders", get(handlers::top_spenders))
        .layer(axum::middleware::from_extractor::<AdminAuth>())
}

/// Model registry inspection and ad hoc routing decisions, behind
/// [`AdminAuth`].
fn router_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::list_models))
        .route("/route", axum::routing::post(handlers::route_request))
        .layer(axum::middleware::from_extractor::<AdminAuth>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use cerebra_analytics::AnalyticsEngine;
    use cerebra_budget::BudgetEnforcer;
    use cerebra_cache::MemoryCacheBackend;
    use cerebra_config::GatewayConfig;
    use cerebra_core::PricingTable;
    use cerebra_migrations::DatabaseType;
    use cerebra_router::{ModelRegistry, Router as SmartRouter};
    use cerebra_store::Store;
    use sqlx::any::AnyPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        for migration in cerebra_migrations::schema::all_migrations() {
            sqlx::query(&migration.up_sql).execute(&pool).await.unwrap();
        }
        let store = Store::from_pool(pool, DatabaseType::SQLite);
        let cache: Arc<dyn cerebra_cache::FastCache> = Arc::new(MemoryCacheBackend::new());
        let config = Arc::new(GatewayConfig {
            port: 8080,
            log_level: "info".to_string(),
            database_url: "sqlite::memory:".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            admin_api_key: "sk-admin-test".to_string(),
            default_retention_days: 90,
            budget_fail_open: false,
            provider_timeout: std::time::Duration::from_secs(30),
        });
        let (log_writer, _task) = crate::log_writer::spawn(store.clone());

        AppState {
            budget: Arc::new(BudgetEnforcer::new(cache.clone(), store.clone(), config.budget_fail_open)),
            analytics: Arc::new(AnalyticsEngine::new(store.clone())),
            pricing: Arc::new(PricingTable::new(Vec::new())),
            router: SmartRouter::new(ModelRegistry::new(Vec::new())),
            cache,
            store,
            log_writer,
            http_client: reqwest::Client::new(),
            config,
            audit: Arc::new(cerebra_telemetry::AuditLogger::disabled()),
        }
    }

    fn test_coordinator() -> Arc<ShutdownCoordinator> {
        Arc::new(ShutdownCoordinator::with_defaults())
    }

    #[tokio::test]
    async fn health_endpoint_is_unauthenticated() {
        let app = create_router(test_state().await, test_coordinator());
        let response =
            app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn budget_admin_endpoint_requires_bearer_token() {
        let app = create_router(test_state().await, test_coordinator());
        let response =
            app.oneshot(Request::builder().uri("/v1/budgets/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
