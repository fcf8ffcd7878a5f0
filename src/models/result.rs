// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Terminal record of one quiz attempt.
/// Several records may exist for the same `user_id` (retries, write races).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[serde(default)]
    pub student_name: String,
    pub score: f64,
    pub total_points: f64,
    #[serde(default)]
    pub completed: bool,
    /// Seconds.
    #[serde(default)]
    pub total_time_spent: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// DTO pushed by the live channel producer: every result record of a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct ResultsSnapshotRequest {
    #[validate(nested)]
    pub results: Vec<QuizResult>,
}
