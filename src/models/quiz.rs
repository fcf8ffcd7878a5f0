// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted quiz fields the monitor reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: String,
    pub title: String,
    pub question_count: u32,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    pub in_progress: bool,
    #[serde(default)]
    pub active_users: Vec<String>,
    #[serde(default)]
    pub last_active_timestamp: Option<DateTime<Utc>>,
}
