//! Requirement extraction
//!
//! Asks the model to read the user's words and returns a typed [`Decision`],
//! tolerating partial or malformed output.

mod decision;
mod extractor;
mod json;

pub use decision::{Decision, DecisionStatus, GENERIC_QUESTION};
pub use extractor::DecisionExtractor;
pub use json::extract_json;
