// src/handlers/monitor.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{error::AppError, monitor::registry::MonitorRegistry};

/// Starts monitoring a quiz and returns the initial view.
///
/// * 404 if the quiz does not exist (monitoring is not started).
/// * 502 if the live channel refused the subscription.
/// * Repeated calls join the running session instead of subscribing again.
pub async fn start_monitoring(
    State(registry): State<MonitorRegistry>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = registry.start(&quiz_id).await?;
    Ok(Json(session.view(Utc::now()).await))
}

/// Stops monitoring a quiz. Idempotent.
pub async fn stop_monitoring(
    State(registry): State<MonitorRegistry>,
    Path(quiz_id): Path<String>,
) -> impl IntoResponse {
    registry.stop(&quiz_id).await;
    StatusCode::NO_CONTENT
}

/// Current live view: active students, suspected cheaters, results and stats.
pub async fn get_monitor(
    State(registry): State<MonitorRegistry>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = registry
        .get(&quiz_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' is not being monitored", quiz_id)))?;

    Ok(Json(session.view(Utc::now()).await))
}

pub async fn health(State(registry): State<MonitorRegistry>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "monitored_quizzes": registry.len().await,
    }))
}
