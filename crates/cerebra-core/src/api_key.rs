//! API key record.
//!
//! The raw key is never persisted: only an indexable prefix and a
//! verifiable hash are stored. See `cerebra-server::auth` for the
//! lookup-then-verify flow that consumes this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable record of an issued API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// First 8 characters of the raw key, used as a non-secret lookup index.
    pub key_prefix: String,
    /// Hex-encoded SHA-256 hash of the full raw key.
    pub key_hash: String,
    /// The entity (agent/user/team member) this key authenticates as.
    pub entity_id: String,
    /// Whether the key has been revoked.
    pub revoked: bool,
    /// When the key was issued.
    pub created_at: DateTime<Utc>,
    /// When the key was last used to authenticate a request, if ever.
    pub last_used: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// First 8 characters of a raw API key, used as the durable-store
    /// lookup index. Panics are impossible: shorter keys are rejected by
    /// the auth layer (minimum 16 characters) before this is called.
    #[must_use]
    pub fn prefix_of(raw_key: &str) -> String {
        raw_key.chars().take(8).collect()
    }

    /// Hex-encoded SHA-256 hash of a raw API key.
    #[must_use]
    pub fn hash_of(raw_key: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(raw_key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_takes_first_eight_chars() {
        assert_eq!(ApiKeyRecord::prefix_of("sk-abcdefghijklmnop"), "sk-abcde");
    }

    #[test]
    fn hash_is_deterministic() {
        let a = ApiKeyRecord::hash_of("sk-test-key-0123456789");
        let b = ApiKeyRecord::hash_of("sk-test-key-0123456789");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_keys_hash_differently() {
        let a = ApiKeyRecord::hash_of("sk-test-key-aaaaaaaaaaaa");
        let b = ApiKeyRecord::hash_of("sk-test-key-bbbbbbbbbbbb");
        assert_ne!(a, b);
    }
}
