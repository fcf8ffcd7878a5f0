// src/monitor/classifier.rs

use serde::Serialize;

use crate::models::session::{CheatAttempt, CheatType};

/// Display severity of an incident. Ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    Elevated,
    High,
}

/// Label and severity shown for one incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncidentCategory {
    pub label: &'static str,
    pub severity: Severity,
}

const UNRECOGNIZED: IncidentCategory = IncidentCategory {
    label: "Unrecognized activity",
    severity: Severity::Low,
};

/// Maps an incident type onto its fixed category. Total: unknown types get the
/// low-severity default row.
pub fn classify_kind(kind: &CheatType) -> IncidentCategory {
    let (label, severity) = match kind {
        CheatType::TabSwitch => ("Left the quiz tab", Severity::Moderate),
        CheatType::WindowBlur => ("Lost window focus", Severity::Moderate),
        CheatType::CopyDetected => ("Clipboard copy attempted", Severity::High),
        CheatType::BrowserClose => ("Closed the browser mid-quiz", Severity::Elevated),
        CheatType::MultipleDevices => ("Concurrent sessions detected", Severity::High),
        CheatType::TimeAnomaly => ("Implausible timing detected", Severity::High),
        CheatType::Other(_) => return UNRECOGNIZED,
    };
    IncidentCategory { label, severity }
}

pub fn classify(attempt: &CheatAttempt) -> IncidentCategory {
    classify_kind(&attempt.kind)
}

/// Most serious severity among a student's incidents, if any.
pub fn highest_severity(attempts: &[CheatAttempt]) -> Option<Severity> {
    attempts.iter().map(|a| classify(a).severity).max()
}

/// Presentation order for the incidents tab. Returns a sorted copy so the
/// cached emission order stays untouched.
pub fn incidents_newest_first(attempts: &[CheatAttempt]) -> Vec<CheatAttempt> {
    let mut sorted = attempts.to_vec();
    // Stable sort keeps source order for equal timestamps.
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}
