use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::LlmProvider;
use super::types::Completion;
use crate::core::config::{PricingTable, Settings};
use crate::core::cost::CostUsd;
use crate::core::errors::ApiError;

const COMPLETION_TEMPERATURE: f64 = 0.1;
const COMPLETION_MAX_TOKENS: u32 = 1000;

/// Adapter for an OpenAI-compatible HTTP API (chat completions + embeddings).
///
/// A missing API key surfaces as an unavailability error without any network
/// call; transport errors, timeouts, and non-success statuses surface as
/// generation failures.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    embedding_model: String,
    pricing: PricingTable,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            api_key: settings.openai_api_key.clone(),
            default_model: settings.default_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            pricing: settings.pricing.clone(),
            client,
        })
    }

    fn require_key(&self, unavailable: fn(String) -> ApiError) -> Result<&str, ApiError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| unavailable("OPENAI_API_KEY is not set".to_string()))
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Deserialize)]
struct ChatMessageBody {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let key = self.require_key(ApiError::EmbeddingUnavailable)?;
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::EmbeddingUnavailable(format!("embedding request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::EmbeddingUnavailable(format!(
                "embedding error {status}: {text}"
            )));
        }

        let payload: EmbeddingsResponse = res.json().await.map_err(ApiError::internal)?;
        Ok(payload.data.into_iter().map(|row| row.embedding).collect())
    }

    async fn complete(&self, prompt: &str, model: Option<&str>) -> Result<Completion, ApiError> {
        let key = self.require_key(ApiError::GenerationUnavailable)?;
        let model = model.unwrap_or(&self.default_model);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": COMPLETION_TEMPERATURE,
            "max_tokens": COMPLETION_MAX_TOKENS,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::GenerationFailed("generation request timed out".to_string())
                } else {
                    ApiError::GenerationFailed(format!("generation request failed: {e}"))
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ApiError::GenerationUnavailable(format!(
                    "provider rejected credentials: {text}"
                )));
            }
            return Err(ApiError::GenerationFailed(format!(
                "generation error {status}: {text}"
            )));
        }

        let payload: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| ApiError::GenerationFailed(format!("decode error: {e}")))?;

        let text = payload
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();
        let usage = payload.usage.unwrap_or_default();

        let price = self.pricing.for_model(model);
        let cost_usd = CostUsd::from_token_usage(
            usage.prompt_tokens,
            usage.completion_tokens,
            price.input_per_1k,
            price.output_per_1k,
        );

        Ok(Completion {
            text,
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            cost_usd,
            provider: self.name().to_string(),
            model: model.to_string(),
        })
    }
}
