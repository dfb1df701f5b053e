//! Redis-backed [`FastCache`], for multi-instance deployments where budget
//! counters and rate-limit windows must be shared across gateway replicas.

use crate::backend::{CacheError, CacheResult, FastCache};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

// INCRBYFLOAT then EXPIRE only if the key had no TTL yet (a fresh
// accounting period). Running this as a single EVAL keeps the
// increment-and-arm-expiry pair atomic: a separate GET-then-SET from the
// caller would race under concurrent requests.
const INCR_FLOAT_SCRIPT: &str = r"
local total = redis.call('INCRBYFLOAT', KEYS[1], ARGV[1])
if redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return total
";

// INCR then EXPIRE only on the increment that created the key, giving a
// fixed (non-sliding) rate-limit window.
const INCR_COUNTER_SCRIPT: &str = r"
local total = redis.call('INCR', KEYS[1])
if total == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return total
";

/// A [`FastCache`] implementation backed by a Redis (or Redis-compatible)
/// server, using a pooled [`ConnectionManager`] for automatic reconnection.
pub struct RedisCacheBackend {
    manager: ConnectionManager,
    key_prefix: String,
    incr_float_script: Script,
    incr_counter_script: Script,
}

impl RedisCacheBackend {
    /// Connect to `url`, namespacing all keys under `key_prefix`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> CacheResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self {
            manager,
            key_prefix: key_prefix.into(),
            incr_float_script: Script::new(INCR_FLOAT_SCRIPT),
            incr_counter_script: Script::new(INCR_COUNTER_SCRIPT),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl FastCache for RedisCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        conn.get(self.prefixed(key))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        let () = conn
            .set_ex(self.prefixed(key), value, seconds)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: u64 = conn
            .del(self.prefixed(key))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn incr_float(&self, key: &str, amount: Decimal, ttl: Duration) -> CacheResult<Decimal> {
        let mut conn = self.manager.clone();
        let result: String = self
            .incr_float_script
            .key(self.prefixed(key))
            .arg(amount.to_string())
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        debug!(key = %key, amount = %amount, "incr_float");
        Decimal::from_str(&result).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    async fn incr_counter(&self, key: &str, ttl: Duration) -> CacheResult<u64> {
        let mut conn = self.manager.clone();
        let total: u64 = self
            .incr_counter_script
            .key(self.prefixed(key))
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(total)
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "redis health check failed");
                CacheError::Unavailable(e.to_string())
            })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
