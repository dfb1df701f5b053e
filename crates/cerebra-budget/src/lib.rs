//! # Cerebra Budget
//!
//! The budget enforcer: atomic check-and-commit of projected spend
//! against a configured limit, for the four enforcement scopes (agent,
//! team, user, org). See [`BudgetEnforcer`] for the two operations,
//! `check_budget` and `record_spend`, and their failure semantics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod decision;
mod enforcer;

pub use decision::{AlertFired, Decision, Denial, DenialReason};
pub use enforcer::{BudgetEnforcer, SPEND_KEY_TTL};
