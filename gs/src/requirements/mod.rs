//! Requirement model and merge policy
//!
//! A [`Requirement`] accumulates what the user wants over a negotiation
//! session. Each extraction round produces a partial snapshot which is folded
//! into the running requirement with [`merge`].

mod merge;
mod model;

pub use merge::merge;
pub use model::{BudgetConstraint, BudgetError, READY_THRESHOLD, Requirement, SPECS_OR_USE_CASE};
