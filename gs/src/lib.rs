//! GearScout - conversational electronics research
//!
//! GearScout talks a shopper through what they want to buy until the
//! requirement is complete enough to search for, then finds listings and
//! writes a comparison report.
//!
//! # Modules
//!
//! - [`requirements`] - Requirement model, completeness check and merging
//! - [`planner`] - Turns model output into validated decisions
//! - [`clarify`] - Picks the next clarification question
//! - [`negotiation`] - The bounded requirement-gathering loop
//! - [`llm`] - LLM client trait and provider implementations
//! - [`search`] - Search backends, listing de-duplication and the file cache
//! - [`report`] - Comparison reports
//! - [`workflow`] - Negotiate, search, report
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod clarify;
pub mod cli;
pub mod config;
pub mod llm;
pub mod negotiation;
pub mod planner;
pub mod prompts;
pub mod report;
pub mod requirements;
pub mod search;
pub mod terminal;
pub mod workflow;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use llm::{LlmClient, LlmError, create_client};
pub use negotiation::{NegotiationError, NegotiationLoop, NegotiationOutcome};
pub use requirements::{BudgetConstraint, Requirement};
pub use search::{Listing, SearchBackend};
pub use workflow::{Workflow, WorkflowOutcome};
