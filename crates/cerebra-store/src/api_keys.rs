//! API key storage: the lookup-by-prefix, verify-by-hash repository that
//! backs authentication (see `cerebra-server::auth`).

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use cerebra_core::ApiKeyRecord;
use chrono::Utc;
use sqlx::Row;

impl Store {
    /// Insert a newly issued API key. The raw key itself is never passed
    /// here or stored anywhere — only its prefix and hash.
    pub async fn insert_api_key(&self, record: &ApiKeyRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO api_keys (key_prefix, key_hash, entity_id, revoked, created_at, last_used) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.key_prefix)
        .bind(&record.key_hash)
        .bind(&record.entity_id)
        .bind(i64::from(record.revoked))
        .bind(record.created_at.to_rfc3339())
        .bind(record.last_used.map(|t| t.to_rfc3339()))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Look up a key record by its 8-character prefix. Returns `None` if no
    /// key with that prefix exists, regardless of revocation status — the
    /// caller (auth layer) decides what to do with a revoked match.
    pub async fn find_api_key_by_prefix(
        &self,
        key_prefix: &str,
    ) -> StoreResult<Option<ApiKeyRecord>> {
        let row = sqlx::query(
            "SELECT key_prefix, key_hash, entity_id, revoked, created_at, last_used \
             FROM api_keys WHERE key_prefix = $1",
        )
        .bind(key_prefix)
        .fetch_optional(self.pool())
        .await?;

        row.map(row_to_record).transpose()
    }

    /// Stamp `last_used` to now for a key that just authenticated a request.
    /// Best-effort: failures are not propagated to the request path.
    pub async fn touch_api_key(&self, key_prefix: &str) -> StoreResult<()> {
        sqlx::query("UPDATE api_keys SET last_used = $1 WHERE key_prefix = $2")
            .bind(Utc::now().to_rfc3339())
            .bind(key_prefix)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Revoke a key so it can no longer authenticate.
    pub async fn revoke_api_key(&self, key_prefix: &str) -> StoreResult<()> {
        sqlx::query("UPDATE api_keys SET revoked = 1 WHERE key_prefix = $1")
            .bind(key_prefix)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn row_to_record(row: sqlx::any::AnyRow) -> StoreResult<ApiKeyRecord> {
    let created_at: String = row.try_get("created_at")?;
    let last_used: Option<String> = row.try_get("last_used")?;
    let revoked: i64 = row.try_get("revoked")?;

    Ok(ApiKeyRecord {
        key_prefix: row.try_get("key_prefix")?,
        key_hash: row.try_get("key_hash")?,
        entity_id: row.try_get("entity_id")?,
        revoked: revoked != 0,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .with_timezone(&Utc),
        last_used: last_used
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .transpose()?,
    })
}
