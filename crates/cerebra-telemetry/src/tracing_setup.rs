//! Structured logging setup, built on `tracing` + `tracing-subscriber`.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging/tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name, attached to every log line.
    pub service_name: String,
    /// Service version, attached to every log line.
    pub service_version: String,
    /// Deployment environment (dev, staging, prod).
    pub environment: String,
    /// `RUST_LOG`-style filter directive, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "cerebra-gateway".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    /// Start a configuration for the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), ..Default::default() }
    }

    /// Set the deployment environment.
    #[must_use]
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = env.into();
        self
    }

    /// Set the fallback log level, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switch to JSON-formatted output, for ingestion by a log pipeline.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Initialize the global `tracing` subscriber.
///
/// # Errors
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry();

    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true).with_filter(filter))
            .try_init()
            .map_err(|e| TracingError::Init(e.to_string()))?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true).with_filter(filter))
            .try_init()
            .map_err(|e| TracingError::Init(e.to_string()))?;
    }

    info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        "tracing initialized"
    );

    Ok(())
}

/// Error initializing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// A global subscriber was already installed, or the filter was invalid.
    #[error("failed to initialize tracing: {0}")]
    Init(String),
}

/// Span for one proxied LLM request.
#[macro_export]
macro_rules! llm_request_span {
    ($request_id:expr, $model:expr, $provider:expr) => {
        tracing::info_span!(
            "llm_request",
            request_id = %$request_id,
            model = %$model,
            provider = %$provider,
        )
    };
}

/// Span for one upstream provider call.
#[macro_export]
macro_rules! provider_span {
    ($provider:expr, $operation:expr) => {
        tracing::info_span!(
            "provider_call",
            provider = %$provider,
            operation = %$operation,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = TracingConfig::new("test-service").with_environment("test").with_log_level("debug");

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.environment, "test");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn default_config_uses_package_name() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "cerebra-gateway");
        assert_eq!(config.log_level, "info");
    }
}
