// src/monitor/metrics.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{result::QuizResult, session::StudentSession};

/// Rendered instead of `00:00` when there is no time to show.
pub const NO_TIME: &str = "N/A";

/// Keeps only the highest-scoring record per `user_id`.
///
/// Output follows the order in which each user first appears. On equal scores
/// the earlier record wins.
pub fn dedupe_results(results: &[QuizResult]) -> Vec<QuizResult> {
    let mut best: Vec<QuizResult> = Vec::with_capacity(results.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in results {
        match index.get(result.user_id.as_str()) {
            Some(&i) => {
                if result.score > best[i].score {
                    best[i] = result.clone();
                }
            }
            None => {
                index.insert(result.user_id.as_str(), best.len());
                best.push(result.clone());
            }
        }
    }

    best
}

/// Percentage of questions answered, rounded, clamped to 0..=100.
/// A quiz without questions reports 0.
pub fn progress(questions_answered: u32, question_count: u32) -> u8 {
    if question_count == 0 {
        return 0;
    }
    let pct = (100.0 * f64::from(questions_answered) / f64::from(question_count)).round();
    pct.clamp(0.0, 100.0) as u8
}

pub fn student_progress(student: &StudentSession, question_count: u32) -> u8 {
    progress(student.questions_answered, question_count)
}

/// Score as a percentage of the available points.
pub fn score_percentage(result: &QuizResult) -> Option<f64> {
    (result.total_points > 0.0).then(|| 100.0 * result.score / result.total_points)
}

/// Summary counters for the monitoring header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStats {
    pub active_students: usize,
    pub students_completed: usize,
    pub students_in_progress: usize,
    pub suspected_cheaters: usize,
    pub average_score_percentage: Option<f64>,
}

impl LiveStats {
    /// `deduped` must already hold one record per user (see [`dedupe_results`]).
    pub fn compute(
        active: &[StudentSession],
        deduped: &[QuizResult],
        suspected_cheaters: usize,
    ) -> Self {
        let distinct_users = deduped.len();
        let completed: Vec<&QuizResult> = deduped.iter().filter(|r| r.completed).collect();

        let percentages: Vec<f64> = completed.iter().filter_map(|r| score_percentage(r)).collect();
        let average_score_percentage = if percentages.is_empty() {
            None
        } else {
            Some(percentages.iter().sum::<f64>() / percentages.len() as f64)
        };

        Self {
            active_students: active.len(),
            students_completed: completed.len(),
            students_in_progress: distinct_users.saturating_sub(completed.len()),
            suspected_cheaters,
            average_score_percentage,
        }
    }
}

/// `mm:ss`; minutes are not wrapped into hours.
pub fn format_elapsed(seconds: Option<u64>) -> String {
    match seconds {
        None | Some(0) => NO_TIME.to_string(),
        Some(s) => format!("{:02}:{:02}", s / 60, s % 60),
    }
}

pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    now.signed_duration_since(started_at).num_seconds().max(0) as u64
}

/// Seconds left before the time limit runs out; `None` for untimed quizzes.
pub fn remaining_seconds(
    started_at: DateTime<Utc>,
    time_limit_minutes: Option<u32>,
    now: DateTime<Utc>,
) -> Option<u64> {
    let limit = u64::from(time_limit_minutes?) * 60;
    Some(limit.saturating_sub(elapsed_seconds(started_at, now)))
}

/// Short relative label for the "last update" indicator.
pub fn format_time_since(seconds: u64) -> String {
    match seconds {
        0..5 => "just now".to_string(),
        5..60 => format!("{}s ago", seconds),
        60..3600 => format!("{}m ago", seconds / 60),
        _ => format!("{}h ago", seconds / 3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionStatus;
    use chrono::TimeDelta;

    fn result(user: &str, score: f64, completed: bool) -> QuizResult {
        QuizResult {
            user_id: user.to_string(),
            student_name: format!("Student {}", user),
            score,
            total_points: 10.0,
            completed,
            total_time_spent: Some(300),
            timestamp: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_highest_score() {
        let results = vec![
            result("A", 5.0, true),
            result("A", 8.0, true),
            result("B", 3.0, true),
        ];

        let deduped = dedupe_results(&results);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].user_id, "A");
        assert_eq!(deduped[0].score, 8.0);
        assert_eq!(deduped[1].user_id, "B");
        assert_eq!(deduped[1].score, 3.0);
    }

    #[test]
    fn test_dedupe_tie_keeps_first() {
        let mut second = result("A", 5.0, false);
        second.student_name = "later".to_string();
        let deduped = dedupe_results(&[result("A", 5.0, true), second]);

        assert_eq!(deduped.len(), 1);
        assert!(deduped[0].completed);
    }

    #[test]
    fn test_progress() {
        assert_eq!(progress(3, 12), 25);
        assert_eq!(progress(0, 12), 0);
        assert_eq!(progress(12, 12), 100);
        assert_eq!(progress(1, 3), 33);
        assert_eq!(progress(2, 3), 67);
        assert_eq!(progress(5, 0), 0);
        assert_eq!(progress(20, 12), 100);
    }

    #[test]
    fn test_stats_do_not_double_count() {
        let results = vec![
            result("A", 5.0, false),
            result("A", 9.0, true),
            result("B", 3.0, false),
            result("C", 6.0, true),
        ];

        let stats = LiveStats::compute(&[], &dedupe_results(&results), 0);

        assert_eq!(stats.students_completed, 2);
        assert_eq!(stats.students_in_progress, 1);
        assert_eq!(stats.average_score_percentage, Some(75.0));
    }

    #[test]
    fn test_stats_counts_active_students() {
        let now = Utc::now();
        let active = vec![StudentSession {
            student_id: "s1".to_string(),
            student_name: "Ana".to_string(),
            status: SessionStatus::Active,
            questions_answered: 1,
            started_at: now,
            last_active: now,
            cheating_attempts: vec![],
        }];

        let stats = LiveStats::compute(&active, &[], 4);

        assert_eq!(stats.active_students, 1);
        assert_eq!(stats.suspected_cheaters, 4);
        assert_eq!(stats.students_in_progress, 0);
        assert_eq!(stats.average_score_percentage, None);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(None), "N/A");
        assert_eq!(format_elapsed(Some(0)), "N/A");
        assert_eq!(format_elapsed(Some(65)), "01:05");
        assert_eq!(format_elapsed(Some(3723)), "62:03");
    }

    #[test]
    fn test_remaining_seconds() {
        let now = Utc::now();
        let started = now - TimeDelta::minutes(25);

        assert_eq!(remaining_seconds(started, Some(30), now), Some(300));
        assert_eq!(remaining_seconds(started, Some(20), now), Some(0));
        assert_eq!(remaining_seconds(started, None, now), None);
    }

    #[test]
    fn test_format_time_since() {
        assert_eq!(format_time_since(2), "just now");
        assert_eq!(format_time_since(42), "42s ago");
        assert_eq!(format_time_since(180), "3m ago");
        assert_eq!(format_time_since(7300), "2h ago");
    }
}
