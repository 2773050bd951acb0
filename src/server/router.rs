use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{ask, health};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// The surface is deliberately small: a liveness probe and the ask endpoint.
/// Document upload, parsing, and metrics aggregation live in sibling
/// services.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-user-id"),
        ]);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/ask", post(ask::ask))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
