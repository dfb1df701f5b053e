//! Model pricing storage. Read-mostly: refreshed out of band, consulted
//! at startup to seed the in-memory pricing table the proxy path reads
//! from on every request (see `cerebra-budget::pricing`).

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use cerebra_core::model::ModelPricing;
use cerebra_core::provider::ProviderKind;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

impl Store {
    /// Insert or replace the pricing row for a `(provider, model)` pair.
    pub async fn upsert_pricing(&self, pricing: &ModelPricing) -> StoreResult<()> {
        let existing = self.get_pricing(pricing.provider, &pricing.model).await?;
        if existing.is_some() {
            sqlx::query(
                "UPDATE model_pricing SET input_per_m = $1, output_per_m = $2, updated_at = $3 \
                 WHERE provider = $4 AND model = $5",
            )
            .bind(pricing.input_per_million.to_string())
            .bind(pricing.output_per_million.to_string())
            .bind(pricing.updated_at.to_rfc3339())
            .bind(pricing.provider.path_segment())
            .bind(&pricing.model)
            .execute(self.pool())
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO model_pricing (provider, model, input_per_m, output_per_m, updated_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(pricing.provider.path_segment())
            .bind(&pricing.model)
            .bind(pricing.input_per_million.to_string())
            .bind(pricing.output_per_million.to_string())
            .bind(pricing.updated_at.to_rfc3339())
            .execute(self.pool())
            .await?;
        }
        Ok(())
    }

    /// Look up the pricing row for a single model.
    pub async fn get_pricing(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> StoreResult<Option<ModelPricing>> {
        let row = sqlx::query(
            "SELECT provider, model, input_per_m, output_per_m, updated_at \
             FROM model_pricing WHERE provider = $1 AND model = $2",
        )
        .bind(provider.path_segment())
        .bind(model)
        .fetch_optional(self.pool())
        .await?;

        row.map(row_to_pricing).transpose()
    }

    /// Load the full pricing table, used to seed the in-memory pricing
    /// table at startup and on periodic refresh.
    pub async fn list_pricing(&self) -> StoreResult<Vec<ModelPricing>> {
        let rows = sqlx::query("SELECT provider, model, input_per_m, output_per_m, updated_at FROM model_pricing")
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(row_to_pricing).collect()
    }
}

fn row_to_pricing(row: sqlx::any::AnyRow) -> StoreResult<ModelPricing> {
    let provider: String = row.try_get("provider")?;
    let input_per_m: String = row.try_get("input_per_m")?;
    let output_per_m: String = row.try_get("output_per_m")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ModelPricing {
        provider: provider
            .parse()
            .map_err(|()| StoreError::Decode(format!("unknown provider {provider:?}")))?,
        model: row.try_get("model")?,
        input_per_million: Decimal::from_str(&input_per_m).map_err(|e| StoreError::Decode(e.to_string()))?,
        output_per_million: Decimal::from_str(&output_per_m).map_err(|e| StoreError::Decode(e.to_string()))?,
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .with_timezone(&Utc),
    })
}
