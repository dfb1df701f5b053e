//! # Cerebra Router
//!
//! The smart model router: complexity assessment, minimum-tier derivation,
//! candidate filtering, and one of four selection strategies. See
//! [`Router::route`] for the single entry point.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod complexity;
mod decision;
mod registry;
mod request;
mod router;
mod strategy;

pub use complexity::Complexity;
pub use decision::RouteDecision;
pub use registry::ModelRegistry;
pub use request::{RouteRequest, RoutingStrategy};
pub use router::Router;
