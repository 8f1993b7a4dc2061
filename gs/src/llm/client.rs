//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM clients
///
/// Implementations handle the specifics of talking to a provider's API.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
