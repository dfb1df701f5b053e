//! API key authentication.
//!
//! Step 1 of the proxy path: extract a raw key from `X-API-Key` or
//! `Authorization: Bearer <key>`, verify it, and resolve it to an entity
//! id. Keys are never stored in plaintext and never used as cache keys —
//! lookup uses an 8-character prefix as an index and a full SHA-256 hash
//! for verification; the cache key is the hash's first 16 hex characters.

use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cerebra_core::ApiKeyRecord;
use std::time::Duration;
use tracing::warn;

use crate::error::ApiError;

/// Minimum length a raw API key must have before any lookup is
/// attempted. Rejecting short keys here means an obviously-malformed key
/// never costs a cache round trip or a database call.
pub const MIN_KEY_LENGTH: usize = 16;

/// How long a successfully authenticated `hash_prefix -> entity_id`
/// mapping stays cached.
pub const AUTH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// The entity an authenticated request is acting as.
#[derive(Debug, Clone)]
pub struct AuthenticatedEntity {
    /// The authenticated caller's entity id.
    pub entity_id: String,
    /// First 16 hex characters of the key's SHA-256 hash, used as the
    /// rate limiter's identity and the auth cache key.
    pub hash_prefix: String,
}

fn extract_raw_key(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn hash_prefix_cache_key(hash_prefix: &str) -> String {
    format!("auth:{hash_prefix}")
}

/// Authenticate a request: the cache-then-store lookup described at the
/// top of this module. Kept as a plain async fn (rather than living
/// solely inside the `FromRequestParts` impl below) so it can be unit
/// tested directly against a constructed `AppState`.
pub async fn authenticate(state: &AppState, parts: &Parts) -> Result<AuthenticatedEntity, ApiError> {
    let raw_key = extract_raw_key(parts).ok_or_else(|| ApiError::unauthorized("missing API key"))?;
    if raw_key.len() < MIN_KEY_LENGTH {
        return Err(ApiError::unauthorized("API key too short"));
    }

    let full_hash = ApiKeyRecord::hash_of(&raw_key);
    let hash_prefix: String = full_hash.chars().take(16).collect();
    let cache_key = hash_prefix_cache_key(&hash_prefix);

    if let Ok(Some(cached)) = state.cache.get(&cache_key).await {
        if let Ok(entity_id) = String::from_utf8(cached) {
            return Ok(AuthenticatedEntity { entity_id, hash_prefix });
        }
    }

    let key_prefix = ApiKeyRecord::prefix_of(&raw_key);
    let record = state
        .store
        .find_api_key_by_prefix(&key_prefix)
        .await
        .map_err(|error| {
            warn!(%error, "durable store unavailable during authentication");
            ApiError::unavailable("authentication store unavailable")
        })?
        .ok_or_else(|| ApiError::unauthorized("unknown API key"))?;

    if record.revoked || record.key_hash != full_hash {
        return Err(ApiError::unauthorized("invalid API key"));
    }

    let _ = state.store.touch_api_key(&key_prefix).await;

    if let Err(error) =
        state.cache.set(&cache_key, record.entity_id.clone().into_bytes(), AUTH_CACHE_TTL).await
    {
        warn!(%error, "failed to cache authenticated entity");
    }

    Ok(AuthenticatedEntity { entity_id: record.entity_id, hash_prefix })
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthenticatedEntity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, parts).await
    }
}

/// Authenticates requests to the admin/analytics API: a single shared
/// bearer token configured at startup, checked directly with no cache or
/// durable lookup (it is a single static comparison, not a per-caller
/// identity).
pub struct AdminAuth;

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing admin bearer token"))?;

        if provided != state.config.admin_api_key {
            return Err(ApiError::unauthorized("invalid admin bearer token"));
        }

        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_key_is_rejected_before_any_lookup() {
        assert!("sk-short".len() < MIN_KEY_LENGTH);
    }

    #[test]
    fn cache_key_is_namespaced() {
        assert_eq!(hash_prefix_cache_key("abcdef0123456789"), "auth:abcdef0123456789");
    }
}
