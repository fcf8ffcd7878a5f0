// src/models/session.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Liveness/integrity state of a single quiz-taker, as reported by the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Idle,
    Submitted,
    SuspectedCheating,
}

/// Kind of integrity violation detected upstream.
///
/// Unknown values are preserved verbatim in `Other` so that a newer producer
/// never breaks deserialization of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheatType {
    TabSwitch,
    WindowBlur,
    CopyDetected,
    BrowserClose,
    MultipleDevices,
    TimeAnomaly,
    Other(String),
}

impl CheatType {
    pub fn as_str(&self) -> &str {
        match self {
            CheatType::TabSwitch => "tab_switch",
            CheatType::WindowBlur => "window_blur",
            CheatType::CopyDetected => "copy_detected",
            CheatType::BrowserClose => "browser_close",
            CheatType::MultipleDevices => "multiple_devices",
            CheatType::TimeAnomaly => "time_anomaly",
            CheatType::Other(raw) => raw,
        }
    }
}

impl From<String> for CheatType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "tab_switch" => CheatType::TabSwitch,
            "window_blur" => CheatType::WindowBlur,
            "copy_detected" => CheatType::CopyDetected,
            "browser_close" => CheatType::BrowserClose,
            "multiple_devices" => CheatType::MultipleDevices,
            "time_anomaly" => CheatType::TimeAnomaly,
            _ => CheatType::Other(raw),
        }
    }
}

impl From<&str> for CheatType {
    fn from(raw: &str) -> Self {
        CheatType::from(raw.to_string())
    }
}

impl From<CheatType> for String {
    fn from(kind: CheatType) -> Self {
        match kind {
            CheatType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CheatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single integrity incident, append-only within a student's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatAttempt {
    #[serde(rename = "type")]
    pub kind: CheatType,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// One student's live session inside a monitored quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentSession {
    #[validate(length(min = 1, max = 128))]
    pub student_id: String,

    /// Display only.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub student_name: String,

    pub status: SessionStatus,

    #[serde(default)]
    pub questions_answered: u32,

    pub started_at: DateTime<Utc>,

    pub last_active: DateTime<Utc>,

    /// Ordered as emitted by the source; never re-sorted by the aggregator.
    #[serde(default)]
    pub cheating_attempts: Vec<CheatAttempt>,
}

impl StudentSession {
    /// Whether this session belongs in the suspected-cheaters view.
    pub fn is_flagged(&self) -> bool {
        self.status == SessionStatus::SuspectedCheating || !self.cheating_attempts.is_empty()
    }
}

/// DTO pushed by the live channel producer: the full active-student list of a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionsSnapshotRequest {
    #[validate(nested)]
    pub active_students: Vec<StudentSession>,
}
