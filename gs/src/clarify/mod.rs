//! Clarification question selection

mod selector;
mod similarity;

pub use selector::{
    BUDGET_QUESTION, CATCH_ALL_QUESTION, ClarificationSelector, SPECS_QUESTION, USE_CASE_QUESTION, fallback_question,
};
pub use similarity::{KeywordSimilarity, SimilarityStrategy};
