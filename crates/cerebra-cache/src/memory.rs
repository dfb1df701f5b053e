//! Single-process fast cache backend, used in tests and single-instance
//! deployments where a real Redis is unavailable.

use crate::backend::{CacheError, CacheResult, FastCache};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() > at)
    }
}

/// In-memory [`FastCache`], backed by a single `RwLock<HashMap>`.
///
/// Increment operations take the write lock for their full
/// read-modify-write, which is what makes them atomic here; the Redis
/// backend gets the same guarantee from a server-side Lua script instead.
pub struct MemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCacheBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FastCache for MemoryCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                data: value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr_float(&self, key: &str, amount: Decimal, ttl: Duration) -> CacheResult<Decimal> {
        let mut entries = self.entries.write().await;
        let (current, has_ttl) = match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let raw = std::str::from_utf8(&entry.data)
                    .map_err(|e| CacheError::Corrupt(e.to_string()))?;
                let value =
                    Decimal::from_str(raw).map_err(|e| CacheError::Corrupt(e.to_string()))?;
                (value, entry.expires_at.is_some())
            }
            _ => (Decimal::ZERO, false),
        };
        let total = current + amount;
        let expires_at = if has_ttl {
            entries.get(key).and_then(|e| e.expires_at)
        } else {
            Some(Instant::now() + ttl)
        };
        entries.insert(
            key.to_string(),
            Entry {
                data: total.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(total)
    }

    async fn incr_counter(&self, key: &str, ttl: Duration) -> CacheResult<u64> {
        let mut entries = self.entries.write().await;
        let (current, has_ttl) = match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let raw = std::str::from_utf8(&entry.data)
                    .map_err(|e| CacheError::Corrupt(e.to_string()))?;
                let value: u64 = raw.parse().map_err(|_| {
                    CacheError::Corrupt(format!("counter value not an integer: {raw:?}"))
                })?;
                (value, entry.expires_at.is_some())
            }
            _ => (0, false),
        };
        let total = current + 1;
        let expires_at = if has_ttl {
            entries.get(key).and_then(|e| e.expires_at)
        } else {
            Some(Instant::now() + ttl)
        };
        entries.insert(
            key.to_string(),
            Entry {
                data: total.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(total)
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn incr_float_accumulates() {
        let cache = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        let a = cache.incr_float("spend:agent-1", dec!(1.5), ttl).await.unwrap();
        let b = cache.incr_float("spend:agent-1", dec!(2.25), ttl).await.unwrap();
        assert_eq!(a, dec!(1.5));
        assert_eq!(b, dec!(3.75));
    }

    #[tokio::test]
    async fn incr_counter_starts_at_one() {
        let cache = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        let a = cache.incr_counter("rate:agent-1", ttl).await.unwrap();
        let b = cache.incr_counter("rate:agent-1", ttl).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[tokio::test]
    async fn expired_entry_resets_counter() {
        let cache = MemoryCacheBackend::new();
        cache
            .incr_counter("rate:agent-1", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let count = cache.incr_counter("rate:agent-1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn get_set_delete_round_trip() {
        let cache = MemoryCacheBackend::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
