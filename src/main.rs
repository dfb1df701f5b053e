//! # Cerebra Gateway
//!
//! Multi-provider LLM API gateway: authenticates callers, enforces
//! hierarchical spending budgets, optionally reroutes a request to a
//! cheaper model, forwards to the upstream provider, and records
//! usage/cost for analytics.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/cerebra \
//! REDIS_URL=redis://localhost:6379 \
//! ADMIN_API_KEY=sk-admin-... \
//!   cerebra-gateway
//! ```

use cerebra_analytics::AnalyticsEngine;
use cerebra_budget::BudgetEnforcer;
use cerebra_cache::{FastCache, MemoryCacheBackend, RedisCacheBackend};
use cerebra_config::GatewayConfig;
use cerebra_core::{ModelInfo, ModelPricing, ModelTier, PricingTable, ProviderKind};
use cerebra_router::{ModelRegistry, Router};
use cerebra_server::AppState;
use cerebra_store::Store;
use cerebra_telemetry::{init_tracing, AuditLogConfig, AuditLogger, TracingConfig};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Application entry point.
#[tokio::main]
async fn main() {
    if let Err(error) = init_tracing(&TracingConfig::default()) {
        eprintln!("failed to initialize logging: {error}");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting cerebra-gateway");

    if let Err(error) = run().await {
        error!(%error, "cerebra-gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env()?;

    let store = Store::connect(&config.database_url).await?;
    info!(database_type = ?store.database_type(), "durable store connected and migrated");

    let cache = build_cache(&config.redis_url).await;

    let pricing_rows = store.list_pricing().await.unwrap_or_default();
    let pricing = if pricing_rows.is_empty() {
        warn!("model_pricing table empty, seeding built-in defaults");
        seed_pricing(&store).await;
        PricingTable::new(builtin_pricing())
    } else {
        PricingTable::new(pricing_rows)
    };

    let registry = ModelRegistry::new(builtin_models());
    info!(models = registry.snapshot().len(), "router registry seeded");
    let router = Router::new(registry);

    let budget = BudgetEnforcer::new(cache.clone(), store.clone(), config.budget_fail_open);
    let analytics = AnalyticsEngine::new(store.clone());

    let audit = if config.admin_api_key.is_empty() {
        AuditLogger::disabled()
    } else {
        AuditLogger::new(AuditLogConfig::default())
    };

    let http_client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .timeout(config.provider_timeout.max(Duration::from_secs(120)))
        .build()?;

    let (log_writer, _log_writer_task) = cerebra_server::log_writer::spawn(store.clone());
    spawn_budget_reset_task(store.clone(), cache.clone(), config.budget_fail_open);

    let state = AppState {
        store,
        cache,
        budget: Arc::new(budget),
        router,
        analytics: Arc::new(analytics),
        pricing: Arc::new(pricing),
        log_writer,
        http_client,
        config: Arc::new(config.clone()),
        audit: Arc::new(audit),
    };

    cerebra_server::server::run(state, config.port).await?;
    Ok(())
}

/// Connect to Redis for the fast cache; fall back to an in-process cache
/// (single-instance only, per the design's documented degradation path)
/// if Redis is unreachable at startup rather than refuse to boot.
async fn build_cache(redis_url: &str) -> Arc<dyn FastCache> {
    match RedisCacheBackend::connect(redis_url, "cerebra").await {
        Ok(backend) => {
            info!("connected to redis fast cache");
            Arc::new(backend)
        }
        Err(error) => {
            warn!(%error, "redis unreachable at startup, falling back to in-process cache");
            Arc::new(MemoryCacheBackend::new())
        }
    }
}

/// Built-in seed models for the smart router registry, spanning all
/// three providers across the three tiers. Replaced wholesale on a
/// config-driven refresh (the registry swap is a pointer swap, not a
/// per-row update) once a live model catalog is wired up.
fn builtin_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            tier: ModelTier::Economy,
            quality_score: 0.62,
            avg_latency_ms: 450.0,
            input_per_million: dec!(0.15),
            output_per_million: dec!(0.60),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o".to_string(),
            tier: ModelTier::Standard,
            quality_score: 0.85,
            avg_latency_ms: 700.0,
            input_per_million: dec!(2.50),
            output_per_million: dec!(10.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: "gpt-4-turbo".to_string(),
            tier: ModelTier::Premium,
            quality_score: 0.90,
            avg_latency_ms: 1100.0,
            input_per_million: dec!(10.0),
            output_per_million: dec!(30.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::OpenAI,
            model: "o1".to_string(),
            tier: ModelTier::Premium,
            quality_score: 0.96,
            avg_latency_ms: 4200.0,
            input_per_million: dec!(15.0),
            output_per_million: dec!(60.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::Anthropic,
            model: "claude-3-5-sonnet".to_string(),
            tier: ModelTier::Standard,
            quality_score: 0.88,
            avg_latency_ms: 650.0,
            input_per_million: dec!(3.0),
            output_per_million: dec!(15.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::Anthropic,
            model: "claude-3-opus".to_string(),
            tier: ModelTier::Premium,
            quality_score: 0.97,
            avg_latency_ms: 1200.0,
            input_per_million: dec!(15.0),
            output_per_million: dec!(75.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::Gemini,
            model: "gemini-1.5-flash".to_string(),
            tier: ModelTier::Economy,
            quality_score: 0.58,
            avg_latency_ms: 400.0,
            input_per_million: dec!(0.075),
            output_per_million: dec!(0.30),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::Gemini,
            model: "gemini-1.5-pro".to_string(),
            tier: ModelTier::Standard,
            quality_score: 0.84,
            avg_latency_ms: 800.0,
            input_per_million: dec!(1.25),
            output_per_million: dec!(5.0),
            success_rate: 1.0,
        },
        ModelInfo {
            provider: ProviderKind::Gemini,
            model: "gemini-ultra".to_string(),
            tier: ModelTier::Premium,
            quality_score: 0.93,
            avg_latency_ms: 1500.0,
            input_per_million: dec!(12.0),
            output_per_million: dec!(36.0),
            success_rate: 1.0,
        },
    ]
}

/// Mirrors [`builtin_models`] as [`ModelPricing`] rows, used to seed the
/// pricing table (and the durable `model_pricing` table) the first time
/// the gateway boots against an empty database.
fn builtin_pricing() -> Vec<ModelPricing> {
    builtin_models()
        .into_iter()
        .map(|model| ModelPricing {
            provider: model.provider,
            model: model.model,
            input_per_million: model.input_per_million,
            output_per_million: model.output_per_million,
            updated_at: Utc::now(),
        })
        .collect()
}

async fn seed_pricing(store: &Store) {
    for pricing in builtin_pricing() {
        if let Err(error) = store.upsert_pricing(&pricing).await {
            warn!(%error, provider = ?pricing.provider, model = %pricing.model, "failed to seed pricing row");
        }
    }
}

/// Periodic background task: every budget's `period` eventually elapses,
/// at which point its `spent`/alerts-latch must return to zero without an
/// operator calling `POST /v1/budgets/reset` by hand. Checked hourly; a
/// period elapsing for any one budget resets all budgets, matching
/// `reset_budgets`'s process-wide semantics.
fn spawn_budget_reset_task(store: Store, cache: Arc<dyn FastCache>, fail_open: bool) {
    tokio::spawn(async move {
        let enforcer = BudgetEnforcer::new(cache, store.clone(), fail_open);
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            match store.list_budgets().await {
                Ok(budgets) => {
                    let expired =
                        budgets.iter().filter(|budget| Utc::now() >= budget.updated_at + budget.period).count();
                    if expired > 0 {
                        info!(expired, "budget periods elapsed, resetting");
                        if let Err(error) = enforcer.reset_budgets().await {
                            warn!(%error, "periodic budget reset failed");
                        }
                    }
                }
                Err(error) => warn!(%error, "failed to list budgets for periodic reset check"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_models_span_every_tier_and_provider() {
        let models = builtin_models();
        assert!(models.iter().any(|m| m.provider == ProviderKind::OpenAI && m.tier == ModelTier::Economy));
        assert!(models.iter().any(|m| m.provider == ProviderKind::Anthropic && m.tier == ModelTier::Premium));
        assert!(models.iter().any(|m| m.provider == ProviderKind::Gemini && m.tier == ModelTier::Standard));
    }

    #[test]
    fn builtin_pricing_mirrors_builtin_models() {
        assert_eq!(builtin_pricing().len(), builtin_models().len());
    }
}
