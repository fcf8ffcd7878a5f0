// src/monitor/staleness.rs

use chrono::{DateTime, TimeDelta, Utc};

use crate::{models::quiz::QuizRecord, monitor::channel::QuizStore};

/// Verdict on a quiz's persisted "in progress" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// In progress, with active users and recent activity.
    Credible,
    /// Not marked in progress. Nothing to correct.
    Idle,
    /// Marked in progress, but nobody is there or nothing happened recently.
    Stale,
}

/// Pure check of the persisted flag against `now`.
/// A missing activity timestamp cannot vouch for the flag and counts as stale.
pub fn assess(quiz: &QuizRecord, now: DateTime<Utc>, window: TimeDelta) -> Staleness {
    if !quiz.in_progress {
        return Staleness::Idle;
    }

    let fresh = quiz
        .last_active_timestamp
        .is_some_and(|last| now.signed_duration_since(last) <= window);

    if !quiz.active_users.is_empty() && fresh {
        Staleness::Credible
    } else {
        Staleness::Stale
    }
}

/// Self-heals a stale "in progress" flag.
///
/// Issues at most one correcting write. If the write fails the failure is
/// logged and the uncorrected record is returned; startup never blocks on it.
pub async fn reconcile(
    store: &dyn QuizStore,
    quiz: QuizRecord,
    now: DateTime<Utc>,
    window: TimeDelta,
) -> QuizRecord {
    if assess(&quiz, now, window) != Staleness::Stale {
        return quiz;
    }

    tracing::info!(
        quiz_id = %quiz.id,
        last_active = ?quiz.last_active_timestamp,
        active_users = quiz.active_users.len(),
        "Quiz marked in progress without recent activity, correcting"
    );

    match store.correct_stale_quiz_state(&quiz.id).await {
        Ok(()) => QuizRecord {
            in_progress: false,
            active_users: Vec::new(),
            ..quiz
        },
        Err(e) => {
            tracing::warn!(quiz_id = %quiz.id, "Stale state correction failed: {}", e);
            quiz
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        writes: AtomicUsize,
        fail: bool,
    }

    impl CountingStore {
        fn new(fail: bool) -> Self {
            Self {
                writes: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl QuizStore for CountingStore {
        async fn lookup_quiz(&self, _quiz_id: &str) -> Result<Option<QuizRecord>, MonitorError> {
            Ok(None)
        }

        async fn correct_stale_quiz_state(&self, _quiz_id: &str) -> Result<(), MonitorError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MonitorError::StaleStateWriteFailure("write rejected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn quiz(in_progress: bool, users: &[&str], hours_ago: Option<i64>, now: DateTime<Utc>) -> QuizRecord {
        QuizRecord {
            id: "quiz-1".to_string(),
            title: "Algebra".to_string(),
            question_count: 12,
            time_limit_minutes: None,
            in_progress,
            active_users: users.iter().map(|u| u.to_string()).collect(),
            last_active_timestamp: hours_ago.map(|h| now - TimeDelta::hours(h)),
        }
    }

    fn window() -> TimeDelta {
        TimeDelta::hours(3)
    }

    #[test]
    fn test_assess_rules() {
        let now = Utc::now();
        assert_eq!(assess(&quiz(true, &["x"], Some(1), now), now, window()), Staleness::Credible);
        assert_eq!(assess(&quiz(true, &["x"], Some(4), now), now, window()), Staleness::Stale);
        assert_eq!(assess(&quiz(true, &[], Some(1), now), now, window()), Staleness::Stale);
        assert_eq!(assess(&quiz(true, &["x"], None, now), now, window()), Staleness::Stale);
        assert_eq!(assess(&quiz(false, &["x"], Some(9), now), now, window()), Staleness::Idle);
    }

    #[tokio::test]
    async fn test_stale_quiz_is_corrected_once() {
        let now = Utc::now();
        let store = CountingStore::new(false);

        let corrected = reconcile(&store, quiz(true, &["x"], Some(4), now), now, window()).await;

        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(!corrected.in_progress);
        assert!(corrected.active_users.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_quiz_is_left_alone() {
        let now = Utc::now();
        let store = CountingStore::new(false);

        let record = reconcile(&store, quiz(true, &["x"], Some(1), now), now, window()).await;

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(record.in_progress);
    }

    #[tokio::test]
    async fn test_idle_quiz_is_not_written() {
        let now = Utc::now();
        let store = CountingStore::new(false);

        reconcile(&store, quiz(false, &[], None, now), now, window()).await;

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_original_values() {
        let now = Utc::now();
        let store = CountingStore::new(true);

        let record = reconcile(&store, quiz(true, &["x"], Some(4), now), now, window()).await;

        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(record.in_progress);
        assert_eq!(record.active_users, vec!["x".to_string()]);
    }
}
