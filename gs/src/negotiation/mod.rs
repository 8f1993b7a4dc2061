//! Requirement negotiation
//!
//! A bounded conversation that turns a vague request into a complete
//! [`Requirement`](crate::requirements::Requirement) or gives up.

mod engine;
mod state;

pub use engine::{DEFAULT_MAX_ROUNDS, NegotiationLoop, is_cancel};
pub use state::{NegotiationError, NegotiationOutcome, NegotiationState, NotConvergedReason};
