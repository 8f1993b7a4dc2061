//! Decision extraction through the LLM

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::decision::Decision;
use crate::llm::{GenerateOptions, LlmClient, LlmError, generate};
use crate::prompts::PromptLoader;
use crate::requirements::Requirement;

/// Response shape shown to the model
fn schema_hint() -> serde_json::Value {
    json!({
        "status": "ready or need_more_info",
        "missing_fields": ["names of missing fields"],
        "extracted_requirements": {
            "product_category": "string",
            "budget": {"min": "number or null", "max": "number", "flexible": "bool", "flexibility_percent": "number or null"},
            "use_case": "string",
            "must_have_specs": {"spec name": "value"},
            "nice_to_have_specs": {"spec name": "value"},
            "deal_breakers": ["string"],
            "preferred_brands": ["string"],
            "excluded_brands": ["string"],
            "priorities": ["most important first"]
        },
        "completeness_score": "0.0 to 1.0",
        "reasoning": "brief explanation",
        "suggested_questions": ["questions to ask if need_more_info"]
    })
}

/// Turns user input into a [`Decision`] via one LLM call
pub struct DecisionExtractor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    thinking: bool,
}

impl DecisionExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, thinking: bool) -> Self {
        Self { llm, prompts, thinking }
    }

    /// Analyze `user_input` against what is already known
    ///
    /// Malformed output degrades to [`Decision::parse_failure`]; backend
    /// errors are returned unchanged.
    pub async fn extract(&self, user_input: &str, existing: Option<&Requirement>) -> Result<Decision, LlmError> {
        debug!(input_len = user_input.len(), has_existing = existing.is_some(), "extract: called");

        let prompt = self
            .prompts
            .render(
                "planner-extract",
                &json!({
                    "user_input": user_input,
                    "existing": existing.map(Requirement::summary),
                }),
            )
            .map_err(|e| LlmError::Prompt(e.to_string()))?;
        let system = self
            .prompts
            .load_template("planner-system")
            .map_err(|e| LlmError::Prompt(e.to_string()))?;

        let options = GenerateOptions {
            temperature: Some(0.3),
            max_tokens: 4096,
            structured: true,
            schema_hint: Some(schema_hint()),
            thinking: self.thinking,
        };

        let text = generate(self.llm.as_ref(), &prompt, &system, &options).await?;
        let decision = Decision::parse(&text, user_input);
        info!(
            status = %decision.status,
            confidence = %decision.confidence,
            missing = ?decision.missing_fields,
            "extract: decision"
        );
        Ok(decision)
    }
}
