// src/monitor/view.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{
        result::QuizResult,
        session::{CheatAttempt, SessionStatus, StudentSession},
    },
    monitor::{
        aggregator::SessionAggregator,
        classifier::{self, Severity},
        lifecycle::{IncidentAlert, MonitorStatus, SessionState},
        metrics::{self, LiveStats},
    },
};

/// Everything the monitoring screen renders, computed from one consistent read.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorView {
    pub quiz_id: String,
    pub title: Option<String>,
    pub status: MonitorStatus,
    pub question_count: u32,
    pub in_progress: bool,
    pub active_students: Vec<ActiveStudentView>,
    pub suspected_cheaters: Vec<SuspectedCheaterView>,
    pub results: Vec<ResultView>,
    pub stats: LiveStats,
    pub last_update: Option<DateTime<Utc>>,
    pub time_since_update: Option<String>,
    pub last_incident: Option<IncidentAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveStudentView {
    pub student_id: String,
    pub student_name: String,
    pub status: SessionStatus,
    pub questions_answered: u32,
    pub progress: u8,
    pub elapsed: String,
    pub remaining: Option<String>,
    pub last_active: DateTime<Utc>,
    pub incident_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuspectedCheaterView {
    pub student_id: String,
    pub student_name: String,
    pub status: SessionStatus,
    pub attempt_count: usize,
    pub highest_severity: Option<Severity>,
    /// Newest first.
    pub incidents: Vec<IncidentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentView {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: &'static str,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub user_id: String,
    pub student_name: String,
    pub score: f64,
    pub total_points: f64,
    pub score_percentage: Option<f64>,
    pub completed: bool,
    pub time_spent: String,
}

impl MonitorView {
    pub(crate) fn build(
        quiz_id: &str,
        state: &SessionState,
        aggregator: &SessionAggregator,
        now: DateTime<Utc>,
    ) -> Self {
        let question_count = state.quiz.as_ref().map_or(0, |q| q.question_count);
        let time_limit = state.quiz.as_ref().and_then(|q| q.time_limit_minutes);

        let active_students = aggregator
            .active_students()
            .iter()
            .map(|s| ActiveStudentView {
                student_id: s.student_id.clone(),
                student_name: s.student_name.clone(),
                status: s.status,
                questions_answered: s.questions_answered,
                progress: metrics::student_progress(s, question_count),
                elapsed: metrics::format_elapsed(Some(metrics::elapsed_seconds(s.started_at, now))),
                remaining: metrics::remaining_seconds(s.started_at, time_limit, now)
                    .map(|secs| metrics::format_elapsed(Some(secs))),
                last_active: s.last_active,
                incident_count: s.cheating_attempts.len(),
            })
            .collect();

        let suspected_cheaters = aggregator
            .suspected_cheaters()
            .iter()
            .map(suspected_view)
            .collect();

        let results = aggregator.deduped_results().iter().map(result_view).collect();

        let stats = LiveStats::compute(
            aggregator.active_students(),
            aggregator.deduped_results(),
            aggregator.cache().len(),
        );

        let last_update = aggregator.last_update();
        let time_since_update = last_update.map(|at| {
            metrics::format_time_since(now.signed_duration_since(at).num_seconds().max(0) as u64)
        });

        Self {
            quiz_id: quiz_id.to_string(),
            title: state.quiz.as_ref().map(|q| q.title.clone()),
            status: state.status,
            question_count,
            in_progress: state.quiz.as_ref().is_some_and(|q| q.in_progress),
            active_students,
            suspected_cheaters,
            results,
            stats,
            last_update,
            time_since_update,
            last_incident: state.last_incident.clone(),
        }
    }
}

fn suspected_view(student: &StudentSession) -> SuspectedCheaterView {
    SuspectedCheaterView {
        student_id: student.student_id.clone(),
        student_name: student.student_name.clone(),
        status: student.status,
        attempt_count: student.cheating_attempts.len(),
        highest_severity: classifier::highest_severity(&student.cheating_attempts),
        incidents: classifier::incidents_newest_first(&student.cheating_attempts)
            .iter()
            .map(incident_view)
            .collect(),
    }
}

fn incident_view(attempt: &CheatAttempt) -> IncidentView {
    let category = classifier::classify(attempt);
    IncidentView {
        kind: attempt.kind.to_string(),
        label: category.label,
        severity: category.severity,
        description: attempt.description.clone(),
        timestamp: attempt.timestamp,
    }
}

fn result_view(result: &QuizResult) -> ResultView {
    ResultView {
        user_id: result.user_id.clone(),
        student_name: result.student_name.clone(),
        score: result.score,
        total_points: result.total_points,
        score_percentage: metrics::score_percentage(result),
        completed: result.completed,
        time_spent: metrics::format_elapsed(result.total_time_spent),
    }
}
