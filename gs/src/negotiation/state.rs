//! Negotiation states, outcomes and errors

use std::fmt;

use thiserror::Error;

use crate::llm::LlmError;
use crate::requirements::Requirement;

/// Where the negotiation loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Init,
    AwaitingExtraction,
    NeedMoreInfo,
    Ready,
    Cancelled,
    Exhausted,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::AwaitingExtraction => "awaiting_extraction",
            Self::NeedMoreInfo => "need_more_info",
            Self::Ready => "ready",
            Self::Cancelled => "cancelled",
            Self::Exhausted => "exhausted",
        };
        write!(f, "{}", name)
    }
}

/// Why negotiation ended without a usable requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotConvergedReason {
    /// The round limit was reached
    Exhausted,
    /// The loop stopped but the requirement failed the completeness check
    IncompleteAtGate,
}

impl fmt::Display for NotConvergedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "ran out of clarification rounds"),
            Self::IncompleteAtGate => write!(f, "requirements still incomplete"),
        }
    }
}

/// Result of a negotiation session
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    /// A requirement that passes the completeness check
    Ready(Requirement),
    /// The user asked to stop
    Cancelled,
    NotConverged {
        reason: NotConvergedReason,
        missing_fields: Vec<String>,
        requirement: Requirement,
    },
}

/// Failures that end a negotiation session early
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("Language model backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("Failed to read user input: {0}")]
    Input(#[from] std::io::Error),
}
