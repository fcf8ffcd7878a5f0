// src/handlers/live.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{result::ResultsSnapshotRequest, session::SessionsSnapshotRequest},
    store::hub::LiveHub,
};

/// Receives the full active-student list of a quiz from the quiz client side.
pub async fn publish_sessions(
    State(hub): State<Arc<LiveHub>>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<SessionsSnapshotRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let delivered = hub.publish_sessions(&quiz_id, payload.active_students).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "delivered": delivered })),
    ))
}

/// Receives every result record of a quiz. Duplicates per user are expected.
pub async fn publish_results(
    State(hub): State<Arc<LiveHub>>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<ResultsSnapshotRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let delivered = hub.publish_results(&quiz_id, payload.results).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "delivered": delivered })),
    ))
}
