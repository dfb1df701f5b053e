//! Errors surfaced by the analytics engine.

use thiserror::Error;

/// Failure modes for an analytics query.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The durable store returned an error.
    #[error("store error: {0}")]
    Store(#[from] cerebra_store::StoreError),
    /// The query did not complete within its fixed deadline.
    #[error("analytics query exceeded its 30s deadline")]
    DeadlineExceeded,
}

/// Result alias for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
