//! LLM client module for GearScout
//!
//! Provides provider clients behind one trait plus a single-prompt helper.

use std::sync::Arc;

use tracing::{debug, warn};

mod anthropic;
pub mod client;
mod error;
mod gemini;
mod http;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::{LlmConfig, ProviderKind};

/// Create an LLM client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, "create_client: called");
    let resolved = config.resolve()?;
    match resolved.kind {
        ProviderKind::Anthropic => {
            debug!("create_client: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(&resolved)?))
        }
        ProviderKind::OpenAi => {
            debug!("create_client: creating OpenAI-compatible client");
            Ok(Arc::new(OpenAIClient::from_config(&resolved)?))
        }
        ProviderKind::Gemini => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(&resolved)?))
        }
    }
}

/// Options for a single-prompt generation
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    /// Ask for a JSON-only answer
    pub structured: bool,
    /// Example or schema appended to structured prompts
    pub schema_hint: Option<serde_json::Value>,
    pub thinking: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: 4096,
            structured: false,
            schema_hint: None,
            thinking: false,
        }
    }
}

/// Build the user prompt, appending the JSON instruction when structured
fn build_prompt(prompt: &str, options: &GenerateOptions) -> String {
    if !options.structured {
        return prompt.to_string();
    }

    match &options.schema_hint {
        Some(schema) => {
            let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
            format!(
                "{}\n\nRespond ONLY with valid JSON matching this schema:\n{}",
                prompt, rendered
            )
        }
        None => format!("{}\n\nRespond ONLY with a valid JSON object.", prompt),
    }
}

/// Send one prompt and return the response text
///
/// An empty string is returned when the model produced no text.
pub async fn generate(
    llm: &dyn LlmClient,
    prompt: &str,
    system: &str,
    options: &GenerateOptions,
) -> Result<String, LlmError> {
    debug!(
        prompt_len = prompt.len(),
        structured = %options.structured,
        thinking = %options.thinking,
        "generate: called"
    );

    let request = CompletionRequest {
        system_prompt: system.to_string(),
        messages: vec![Message::user(build_prompt(prompt, options))],
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        thinking: options.thinking,
    };

    let response = llm.complete(request).await?;
    debug!(
        stop_reason = ?response.stop_reason,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "generate: response received"
    );
    if response.stop_reason == StopReason::MaxTokens {
        warn!(max_tokens = options.max_tokens, "generate: response truncated at max tokens");
    }
    Ok(response.content.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::client::mock::MockLlmClient;
    use super::*;

    #[test]
    fn test_build_prompt_plain() {
        assert_eq!(build_prompt("hello", &GenerateOptions::default()), "hello");
    }

    #[test]
    fn test_build_prompt_structured_with_schema() {
        let options = GenerateOptions {
            structured: true,
            schema_hint: Some(serde_json::json!({"status": "ready | need_more_info"})),
            ..GenerateOptions::default()
        };
        let prompt = build_prompt("Extract", &options);
        assert!(prompt.starts_with("Extract\n\nRespond ONLY with valid JSON"));
        assert!(prompt.contains("\"status\": \"ready | need_more_info\""));
    }

    #[test]
    fn test_build_prompt_structured_without_schema() {
        let options = GenerateOptions {
            structured: true,
            ..GenerateOptions::default()
        };
        assert!(build_prompt("Extract", &options).ends_with("valid JSON object."));
    }

    #[tokio::test]
    async fn test_generate_passes_options() {
        let mock = MockLlmClient::with_texts(["an answer"]);
        let options = GenerateOptions {
            temperature: Some(0.2),
            max_tokens: 200,
            thinking: true,
            ..GenerateOptions::default()
        };

        let text = generate(&mock, "question", "system", &options).await.unwrap();
        assert_eq!(text, "an answer");

        let request = &mock.requests()[0];
        assert_eq!(request.system_prompt, "system");
        assert_eq!(request.max_tokens, 200);
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.thinking);
        assert_eq!(request.messages[0].content, "question");
    }

    #[tokio::test]
    async fn test_generate_propagates_errors() {
        let mock = MockLlmClient::new(vec![]);
        assert!(generate(&mock, "q", "", &GenerateOptions::default()).await.is_err());
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "nope".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_client(&config), Err(LlmError::Config(_))));
    }
}
