// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{live, monitor},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Monitoring control and views under `/api/monitor`.
/// * Snapshot ingest for the live channel under `/api/live`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            axum::http::HeaderValue::from_static("http://localhost:3000"),
            axum::http::HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let monitor_routes = Router::new()
        .route("/{quiz_id}", get(monitor::get_monitor))
        .route("/{quiz_id}/start", post(monitor::start_monitoring))
        .route("/{quiz_id}/stop", post(monitor::stop_monitoring));

    let live_routes = Router::new()
        .route("/{quiz_id}/sessions", post(live::publish_sessions))
        .route("/{quiz_id}/results", post(live::publish_results));

    Router::new()
        .route("/api/health", get(monitor::health))
        .nest("/api/monitor", monitor_routes)
        .nest("/api/live", live_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
