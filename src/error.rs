// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 502 Bad Gateway (live channel could not be reached)
    BadGateway(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => {
                tracing::warn!("Live channel failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Failures surfaced by the monitoring core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The quiz does not exist. Terminal for this monitoring attempt.
    NotFound(String),

    /// The correcting write for a stale "in progress" flag failed.
    StaleStateWriteFailure(String),

    /// The live subscription could not be established or dropped afterwards.
    ChannelFailure(String),

    /// The quiz store itself failed while looking the quiz up.
    Store(String),

    /// `start` was called on a session that has already been stopped.
    Stopped,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::NotFound(id) => write!(f, "Quiz '{}' not found", id),
            MonitorError::StaleStateWriteFailure(msg) => {
                write!(f, "Failed to correct stale quiz state: {}", msg)
            }
            MonitorError::ChannelFailure(msg) => write!(f, "Live channel failure: {}", msg),
            MonitorError::Store(msg) => write!(f, "Quiz store failure: {}", msg),
            MonitorError::Stopped => write!(f, "Monitoring session already stopped"),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        MonitorError::Store(err.to_string())
    }
}

impl From<MonitorError> for AppError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::NotFound(_) => AppError::NotFound(err.to_string()),
            MonitorError::ChannelFailure(_) => AppError::BadGateway(err.to_string()),
            MonitorError::Stopped => AppError::BadRequest(err.to_string()),
            MonitorError::StaleStateWriteFailure(_) | MonitorError::Store(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}
