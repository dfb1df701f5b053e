//! The [`FastCache`] backend abstraction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Failure modes for fast-cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or mangled an operation.
    #[error("cache operation failed: {0}")]
    Operation(String),

    /// A value stored in the cache could not be decoded.
    #[error("cache value corrupt: {0}")]
    Corrupt(String),
}

/// Result type for fast-cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// A fast, possibly-distributed key/value store used for budget spend
/// counters and rate-limit windows.
///
/// The two counter operations (`incr_float`, `incr_counter`) must be
/// single-round-trip atomic: a `GET` followed by a `SET` from the caller
/// is a race under concurrent requests and is never an acceptable
/// implementation of this trait.
#[async_trait]
pub trait FastCache: Send + Sync {
    /// Fetch a raw value.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a raw value with a TTL.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove a key.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically add `amount` to the Decimal stored at `key`, creating it
    /// at `amount` if absent, and set its TTL to `ttl` only if the key had
    /// no TTL before this call (i.e. this is the first increment of a
    /// fresh accounting period). Returns the new total.
    async fn incr_float(&self, key: &str, amount: Decimal, ttl: Duration) -> CacheResult<Decimal>;

    /// Atomically increment the integer counter at `key`, creating it at 1
    /// if absent, and set its TTL to `ttl` only on creation (fixed-window
    /// semantics: the window does not slide on subsequent hits). Returns
    /// the new count.
    async fn incr_counter(&self, key: &str, ttl: Duration) -> CacheResult<u64>;

    /// Cheap connectivity probe used by readiness checks.
    async fn health_check(&self) -> CacheResult<()>;

    /// Backend name, for logging.
    fn name(&self) -> &'static str;
}
