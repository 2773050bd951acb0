use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the whole crate.
///
/// Components below the orchestrator return this same shape; the orchestrator
/// is the single point translating pipeline failures for the caller. `Clone`
/// is required so a single-flight outcome can be shared between concurrent
/// callers.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("no relevant documents found")]
    NoCandidates,
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("generation provider unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::NoCandidates => (
                StatusCode::NOT_FOUND,
                "No relevant documents found".to_string(),
            ),
            ApiError::EmbeddingUnavailable(msg) | ApiError::GenerationUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ApiError::GenerationFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
