use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Token relay
        .route("/get-token", get(handlers::get_token))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // The relay is called from a browser page on another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
