use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/live/connect", post(handlers::connect))
        .route("/live/disconnect", post(handlers::disconnect))
        .route("/live/mute", post(handlers::set_muted))
        // Session queries
        .route("/live/status", get(handlers::get_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // The front end runs in a browser on a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
