//! # Cerebra Cache
//!
//! The fast cache sits in front of the durable store for two hot-path,
//! write-heavy jobs: accumulating budget spend within the current period,
//! and counting requests within a rate-limit window. Both require an
//! atomic increment-and-arm-expiry, not a plain key/value `GET`/`SET` pair.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod key;
mod memory;
mod redis_backend;

pub use backend::{CacheError, CacheResult, FastCache};
pub use key::{budget_spend_key, rate_limit_key};
pub use memory::MemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
