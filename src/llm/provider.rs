use async_trait::async_trait;

use super::types::Completion;
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// generate embeddings for a batch of inputs
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// chat completion (non-streaming); `model` overrides the configured default
    async fn complete(&self, prompt: &str, model: Option<&str>) -> Result<Completion, ApiError>;
}
