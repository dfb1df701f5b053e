//! # Cerebra Config
//!
//! Process-level configuration, loaded once at startup from environment
//! variables. There is no file-watching or hot-reload here: the gateway
//! expects a restart to pick up new configuration, which keeps the
//! budget/router state machines free of a moving config underneath them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Everything the gateway needs to start serving traffic.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// TCP port the HTTP server listens on.
    pub port: u16,
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"cerebra_server=debug,info"`.
    pub log_level: String,
    /// `sqlx` connection string for the durable store (Postgres or SQLite).
    pub database_url: String,
    /// Redis connection string for the fast cache.
    pub redis_url: String,
    /// Bearer key that authenticates calls to the admin/analytics endpoints.
    pub admin_api_key: String,
    /// How long completed `api_requests` rows are kept before being pruned.
    pub default_retention_days: u32,
    /// When the fast cache is unreachable, whether budget checks should
    /// fail open (admit the request) or fail closed (reject it).
    pub budget_fail_open: bool,
    /// Per-attempt timeout for upstream provider calls.
    pub provider_timeout: Duration,
}

/// Failure to assemble a [`GatewayConfig`] from the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    /// An environment variable was set but could not be parsed.
    #[error("invalid value for environment variable {name}: {value:?}")]
    Invalid {
        /// Name of the offending variable.
        name: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn env_var_or(name: &'static str, default: impl Into<String>) -> String {
    env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// `DATABASE_URL`, `REDIS_URL`, and `ADMIN_API_KEY` are required; every
    /// other field has a documented default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_env("CEREBRA_PORT", 8080u16)?;
        let log_level = env_var_or("CEREBRA_LOG_LEVEL", "info");
        let database_url = env_var("DATABASE_URL")?;
        let redis_url = env_var("REDIS_URL")?;
        let admin_api_key = env_var("ADMIN_API_KEY")?;
        let default_retention_days = parse_env("CEREBRA_RETENTION_DAYS", 90u32)?;
        let budget_fail_open = parse_env("CEREBRA_BUDGET_FAIL_OPEN", false)?;
        let provider_timeout_seconds = parse_env("CEREBRA_PROVIDER_TIMEOUT_SECONDS", 30u64)?;

        Ok(Self {
            port,
            log_level,
            database_url,
            redis_url,
            admin_api_key,
            default_retention_days,
            budget_fail_open,
            provider_timeout: Duration::from_secs(provider_timeout_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "CEREBRA_PORT",
            "CEREBRA_LOG_LEVEL",
            "DATABASE_URL",
            "REDIS_URL",
            "ADMIN_API_KEY",
            "CEREBRA_RETENTION_DAYS",
            "CEREBRA_BUDGET_FAIL_OPEN",
            "CEREBRA_PROVIDER_TIMEOUT_SECONDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_var_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = GatewayConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn defaults_fill_in_optional_fields() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "sqlite://cerebra.db");
        env::set_var("REDIS_URL", "redis://localhost:6379");
        env::set_var("ADMIN_API_KEY", "sk-admin-test");

        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_retention_days, 90);
        assert!(!config.budget_fail_open);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        clear_env();
    }

    #[test]
    fn invalid_port_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "sqlite://cerebra.db");
        env::set_var("REDIS_URL", "redis://localhost:6379");
        env::set_var("ADMIN_API_KEY", "sk-admin-test");
        env::set_var("CEREBRA_PORT", "not-a-port");

        let err = GatewayConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CEREBRA_PORT", .. }));
        clear_env();
    }
}
