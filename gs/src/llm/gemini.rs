//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait for the `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::send_with_retry;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, Role, StopReason, TokenUsage};
use crate::config::ResolvedLlmConfig;

/// Google Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from resolved configuration
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key()?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = serde_json::json!(temperature);
        }

        let mut body = serde_json::json!({
            "contents": self.convert_messages(&request.messages),
            "generationConfig": generation_config,
        });

        if !request.system_prompt.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": request.system_prompt}],
            });
        }

        body
    }

    /// Gemini calls the assistant role "model"
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{"text": msg.content}],
                })
            })
            .collect()
    }

    /// Parse the Gemini API response, joining the first candidate's text parts
    fn parse_response(&self, api_response: GeminiResponse) -> CompletionResponse {
        debug!(candidates = %api_response.candidates.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.candidates.into_iter().next() {
            Some(candidate) => {
                let text: String = candidate
                    .content
                    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default();
                let content = if text.is_empty() { None } else { Some(text) };
                (content, StopReason::from_gemini(candidate.finish_reason.as_deref()))
            }
            None => {
                debug!("parse_response: no candidates");
                (None, StopReason::EndTurn)
            }
        };

        let usage = api_response.usage_metadata.unwrap_or_default();
        CompletionResponse {
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(&request);

        let response = send_with_retry("gemini", self.timeout, || {
            self.http
                .post(url.clone())
                .header("x-goog-api-key", self.api_key.clone())
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        let api_response: GeminiResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient {
            model: "gemini-2.5-pro".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: Client::new(),
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_build_request_body() {
        let request = CompletionRequest {
            system_prompt: "You compare products".to_string(),
            messages: vec![Message::user("laptop"), Message::assistant("budget?")],
            max_tokens: 4000,
            temperature: Some(0.5),
            thinking: true,
        };
        let body = client().build_request_body(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You compare products");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "budget?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_build_request_body_without_system() {
        let request = CompletionRequest {
            system_prompt: String::new(),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: None,
            thinking: false,
        };
        let body = client().build_request_body(&request);
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_parse_response() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 2}
        });
        let api_response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = client().parse_response(api_response);

        assert_eq!(response.content.as_deref(), Some("Hello there"));
        assert_eq!(response.usage.input_tokens, 7);
        assert_eq!(response.usage.output_tokens, 2);
    }

    #[test]
    fn test_parse_response_blocked() {
        let raw = serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]});
        let api_response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = client().parse_response(api_response);

        assert!(response.content.is_none());
        assert_eq!(response.stop_reason, StopReason::ContentFilter);
    }
}
