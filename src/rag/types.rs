//! Request and response types for the answer pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::cost::CostUsd;
use crate::core::errors::ApiError;

pub const QUERY_MAX_CHARS: usize = 1000;
pub const K_MIN: usize = 1;
pub const K_MAX: usize = 20;
pub const CONTEXT_TOKENS_MIN: usize = 100;
pub const CONTEXT_TOKENS_MAX: usize = 8000;
pub const MODEL_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_k() -> usize {
    5
}

fn default_max_context_tokens() -> usize {
    2000
}

impl AnswerRequest {
    /// Boundary validation; invalid requests never reach the ranker.
    pub fn validate(&self) -> Result<(), ApiError> {
        let query_chars = self.query.chars().count();
        if query_chars == 0 || query_chars > QUERY_MAX_CHARS {
            return Err(ApiError::BadRequest(format!(
                "query must be 1-{QUERY_MAX_CHARS} characters"
            )));
        }
        if self.k < K_MIN || self.k > K_MAX {
            return Err(ApiError::BadRequest(format!(
                "k must be {K_MIN}-{K_MAX}"
            )));
        }
        if self.max_context_tokens < CONTEXT_TOKENS_MIN
            || self.max_context_tokens > CONTEXT_TOKENS_MAX
        {
            return Err(ApiError::BadRequest(format!(
                "max_context_tokens must be {CONTEXT_TOKENS_MIN}-{CONTEXT_TOKENS_MAX}"
            )));
        }
        if let Some(model) = &self.model {
            if model.is_empty() || model.chars().count() > MODEL_MAX_CHARS {
                return Err(ApiError::BadRequest(format!(
                    "model must be 1-{MODEL_MAX_CHARS} characters"
                )));
            }
        }
        Ok(())
    }
}

/// A ranked chunk reference. Produced transiently by retrieval, consumed by
/// budgeting and prompt composition; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalItem {
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub score: f64,
    pub snippet: String,
}

/// A retrieval item that survived budgeting, exposed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub snippet: String,
    pub score: f64,
}

impl From<RetrievalItem> for Citation {
    fn from(item: RetrievalItem) -> Self {
        Citation {
            document_id: item.document_id,
            chunk_index: item.chunk_index,
            snippet: item.snippet,
            score: item.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    /// Citation order equals budgeted-retrieval order; never re-sorted.
    pub citations: Vec<Citation>,
    pub provider: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: CostUsd,
    pub latency_ms: u64,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(k: usize) -> AnswerRequest {
        AnswerRequest {
            query: "What are the elements of a contract?".to_string(),
            k,
            max_context_tokens: 2000,
            model: None,
        }
    }

    #[test]
    fn defaults_apply_on_deserialization() {
        let request: AnswerRequest =
            serde_json::from_str(r#"{"query": "test"}"#).expect("parse");
        assert_eq!(request.k, 5);
        assert_eq!(request.max_context_tokens, 2000);
        assert!(request.model.is_none());
    }

    #[test]
    fn zero_k_is_rejected_at_the_boundary() {
        assert!(matches!(
            request(0).validate(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn k_above_twenty_is_rejected() {
        assert!(request(21).validate().is_err());
        assert!(request(20).validate().is_ok());
    }

    #[test]
    fn empty_and_overlong_queries_are_rejected() {
        let mut req = request(5);
        req.query = String::new();
        assert!(req.validate().is_err());

        req.query = "q".repeat(QUERY_MAX_CHARS + 1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn context_token_bounds_are_enforced() {
        let mut req = request(5);
        req.max_context_tokens = 99;
        assert!(req.validate().is_err());

        req.max_context_tokens = 8001;
        assert!(req.validate().is_err());

        req.max_context_tokens = 100;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn overlong_model_is_rejected() {
        let mut req = request(5);
        req.model = Some("m".repeat(MODEL_MAX_CHARS + 1));
        assert!(req.validate().is_err());
    }
}
