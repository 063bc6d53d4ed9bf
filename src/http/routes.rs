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
        // Session lifecycle
        .route("/sessions/start", post(handlers::start_session))
        .route(
            "/sessions/:session_id/stop",
            post(handlers::stop_session),
        )
        // Audio ingestion
        .route(
            "/sessions/:session_id/chunks",
            post(handlers::submit_chunk),
        )
        // Live transcript event stream
        .route(
            "/sessions/:session_id/events",
            get(handlers::event_stream),
        )
        // Session queries
        .route(
            "/sessions/:session_id/status",
            get(handlers::session_status),
        )
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::session_transcript),
        )
        // Browser microphone clients upload from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
