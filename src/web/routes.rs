//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.settings.server.max_body_size);

    Router::new()
        // Feature routes
        .route("/api/chat", post(handlers::chat))
        .route("/api/chat/stream", post(handlers::chat_stream))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/analyze/stream", post(handlers::analyze_stream))
        .route("/api/tips", post(handlers::tips))
        .route("/api/tips/categories", get(handlers::tip_categories))
        // Service routes
        .route("/health", get(handlers::health))
        // Add middleware
        .layer(body_limit)
        .layer(cors)
        // Add state
        .with_state(state)
}
