//! Durable-store error type.

use thiserror::Error;

/// Result type for durable-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure modes for the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A column could not be decoded into its domain type (e.g. a corrupt
    /// decimal or timestamp string).
    #[error("decode error: {0}")]
    Decode(String),

    /// Migration setup failed.
    #[error("migration error: {0}")]
    Migration(#[from] cerebra_migrations::MigrationError),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A compare-and-swap retry loop gave up after repeated concurrent
    /// writers raced the same row.
    #[error("gave up after {0} attempts contending for the same row")]
    Contention(u32),
}
