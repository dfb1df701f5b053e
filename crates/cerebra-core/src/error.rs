//! Gateway-wide error type.
//!
//! The variants mirror the error kinds named in the gateway design: each one
//! maps to exactly one HTTP status at the edge (see `cerebra-server::error`),
//! but the mapping itself lives outside this crate so that core stays free
//! of any HTTP dependency.

use std::fmt;

/// Result type used throughout the gateway core.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// A gateway-wide error.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed input: a bad URL shape, unparseable JSON body, or an
    /// out-of-range query parameter.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid API key.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// A budget scope denied the request.
    #[error("budget exceeded for {scope} {entity}")]
    BudgetExceeded {
        /// The scope that denied the request (agent, team, user, org).
        scope: String,
        /// The entity id within that scope.
        entity: String,
    },

    /// The caller or key exceeded its rate limit.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The upstream provider could not be reached (connection/dial/I-O failure).
    #[error("upstream network error: {0}")]
    UpstreamNetwork(String),

    /// The upstream responded but its body could not be parsed for usage
    /// accounting. Non-fatal: the response is still relayed, usage is zero.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// A required dependency (cache, durable store) is unavailable.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Construct a [`GatewayError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Construct a [`GatewayError::Authentication`].
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Construct a [`GatewayError::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable error kind, used in response bodies and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication(_) => "authentication",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::RateLimited => "rate_limited",
            Self::UpstreamNetwork(_) => "upstream_network",
            Self::UpstreamProtocol(_) => "upstream_protocol",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

/// A scope/entity pair naming the budget that denied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedBudget {
    /// Scope of the denying budget.
    pub scope: crate::budget::BudgetScope,
    /// Entity id of the denying budget.
    pub entity_id: String,
}

impl fmt::Display for DeniedBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(GatewayError::validation("x").kind(), "validation");
        assert_eq!(GatewayError::RateLimited.kind(), "rate_limited");
        assert_eq!(
            GatewayError::BudgetExceeded {
                scope: "team".into(),
                entity: "t1".into()
            }
            .kind(),
            "budget_exceeded"
        );
    }
}
