//! Prompt templates
//!
//! Handlebars templates embedded in the binary, overridable from disk.

mod embedded;
mod loader;

pub use loader::PromptLoader;
