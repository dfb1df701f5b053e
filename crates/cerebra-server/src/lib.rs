//! # Cerebra Server
//!
//! HTTP surface for the gateway: the proxy path and the budget/analytics/
//! router admin API, built on axum.
//!
//! - [`routes::create_router`] assembles the full route table.
//! - [`state::AppState`] is the per-request handle shared across handlers.
//! - [`server`] binds the listener and runs it with graceful shutdown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod health;
pub mod log_writer;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use auth::{AdminAuth, AuthenticatedEntity};
pub use error::ApiError;
pub use routes::create_router;
pub use shutdown::{GracefulServer, RequestGuard, ShutdownConfig, ShutdownCoordinator, ShutdownEvent, ShutdownPhase};
pub use state::AppState;
