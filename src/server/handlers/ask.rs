use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::core::errors::ApiError;
use crate::rag::types::{AnswerRequest, AnswerResponse};
use crate::state::AppState;

const USER_HEADER: &str = "x-user-id";

/// Opaque, externally-verified user identifier. Authentication happens
/// upstream of this service; this layer only requires the identifier to be
/// present.
fn require_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or(ApiError::Unauthorized)
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let response = state.ask.ask(&user_id, request).await?;
    Ok(Json(response))
}
