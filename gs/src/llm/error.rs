//! LLM error types

use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderConfigError;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ProviderConfigError),

    #[error("Prompt template error: {0}")]
    Prompt(String),
}

impl LlmError {
    /// Whether trying again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
            LlmError::Config(_) => false,
            LlmError::Prompt(_) => false,
        }
    }

    /// Delay requested by the provider, for rate limits
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// What the user should check to get the backend working again
    pub fn hint(&self) -> &'static str {
        match self {
            LlmError::Config(e) => e.hint(),
            LlmError::ApiError { status: 401 | 403, .. } => "The API key was rejected. Check that it is valid for this provider.",
            LlmError::ApiError { status: 404, .. } => "Check the configured model name and base-url.",
            LlmError::RateLimited { .. } => "The provider is rate limiting requests. Wait and try again.",
            LlmError::Network(_) | LlmError::Timeout(_) => {
                "Could not reach the provider. Check your network connection and base-url."
            }
            LlmError::Prompt(_) => "Check the templates in your prompts-dir override.",
            _ => "Check the llm section of your configuration (provider, model, base-url).",
        }
    }
}
