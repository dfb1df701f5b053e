//! The durable store: a pooled connection to Postgres or SQLite, migrated
//! to the current schema on startup.

use crate::error::{StoreError, StoreResult};
use cerebra_migrations::{DatabaseType, MigrationConfig, Migrator};
use sqlx::AnyPool;
use tracing::info;

/// Durable store handle, shared across the proxy path, budget enforcer,
/// and analytics engine.
///
/// Cheap to clone: `sqlx::AnyPool` is itself a handle around a pooled set
/// of connections (default 20, see [`Store::connect_with_max`]).
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    database_type: DatabaseType,
}

impl Store {
    /// Default connection pool size, per the design's bounded-pool policy.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

    /// Connect and run pending migrations, using the default pool size.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with_max(database_url, Self::DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit maximum pool size, then run pending
    /// migrations so the schema is always current before the gateway
    /// serves traffic.
    pub async fn connect_with_max(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let database_type = DatabaseType::from_url(database_url).unwrap_or_default();

        let config = MigrationConfig::builder()
            .database_url(database_url)
            .database_type(database_type)
            .max_connections(max_connections)
            .build()?;

        let mut migrator = Migrator::new(config).await?;
        migrator.init().await?;
        migrator.add_migrations(cerebra_migrations::schema::all_migrations());
        let applied = migrator.run_pending().await?;
        if !applied.is_empty() {
            info!(count = applied.len(), "applied pending migrations");
        }

        let pool = migrator.pool().inner().clone();
        Ok(Self { pool, database_type })
    }

    /// Wrap an already-connected, already-migrated pool. Used by tests
    /// that set up an in-memory SQLite database directly.
    #[must_use]
    pub fn from_pool(pool: AnyPool, database_type: DatabaseType) -> Self {
        Self { pool, database_type }
    }

    /// The underlying pool, for repository modules in this crate.
    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// The dialect this store is connected to, for any SQL that must
    /// branch on it.
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    /// Cheap liveness probe used by `GET /ready`.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
