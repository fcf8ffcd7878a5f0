// src/monitor/aggregator.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    models::{result::QuizResult, session::StudentSession},
    monitor::metrics::dedupe_results,
};

/// Best-known session of every student ever seen flagged during one
/// monitoring session. Entries are never evicted while monitoring runs, and a
/// student's cached incident list never gets shorter.
#[derive(Debug, Default)]
pub struct SuspectedCheatersCache {
    entries: Vec<StudentSession>,
    index: HashMap<String, usize>,
}

impl SuspectedCheatersCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one snapshot into the cache. Idempotent: merging the same
    /// snapshot twice leaves the cache unchanged.
    pub fn merge(&mut self, snapshot: &[StudentSession]) {
        for student in snapshot.iter().filter(|s| s.is_flagged()) {
            match self.index.get(&student.student_id) {
                None => {
                    self.index
                        .insert(student.student_id.clone(), self.entries.len());
                    self.entries.push(student.clone());
                }
                Some(&i) => {
                    let cached = &mut self.entries[i];
                    // Compared by count only: a shorter report never erases
                    // an incident that was already seen.
                    if student.cheating_attempts.len() >= cached.cheating_attempts.len() {
                        *cached = student.clone();
                    } else {
                        let kept = std::mem::take(&mut cached.cheating_attempts);
                        *cached = StudentSession {
                            cheating_attempts: kept,
                            ..student.clone()
                        };
                    }
                }
            }
        }
    }

    pub fn get(&self, student_id: &str) -> Option<&StudentSession> {
        self.index.get(student_id).map(|&i| &self.entries[i])
    }

    /// Entries in the order students were first flagged.
    pub fn entries(&self) -> &[StudentSession] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// Live view state for one monitored quiz.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    active: Vec<StudentSession>,
    results: Vec<QuizResult>,
    cache: SuspectedCheatersCache,
    last_update: Option<DateTime<Utc>>,
    /// Cached attempt counts as of the previous tick.
    ticked_counts: HashMap<String, usize>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the latest active-student snapshot and merges it into the cache.
    pub fn apply_sessions(&mut self, snapshot: Vec<StudentSession>, now: DateTime<Utc>) {
        self.cache.merge(&snapshot);
        self.active = snapshot;
        self.last_update = Some(now);
    }

    /// Stores the deduplicated view of the latest result snapshot.
    pub fn apply_results(&mut self, results: &[QuizResult], now: DateTime<Utc>) {
        self.results = dedupe_results(results);
        self.last_update = Some(now);
    }

    /// Periodic recompute. Re-merges the latest snapshot with the same merge
    /// used on arrival, then returns the ids of students whose cached incident
    /// count grew since the previous tick.
    pub fn tick(&mut self) -> Vec<String> {
        self.cache.merge(&self.active);

        let mut grown = Vec::new();
        for student in self.cache.entries() {
            let count = student.cheating_attempts.len();
            let previous = self
                .ticked_counts
                .insert(student.student_id.clone(), count)
                .unwrap_or(0);
            if count > previous {
                grown.push(student.student_id.clone());
            }
        }
        grown
    }

    pub fn active_students(&self) -> &[StudentSession] {
        &self.active
    }

    pub fn suspected_cheaters(&self) -> &[StudentSession] {
        self.cache.entries()
    }

    pub fn deduped_results(&self) -> &[QuizResult] {
        &self.results
    }

    pub fn cache(&self) -> &SuspectedCheatersCache {
        &self.cache
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Drops everything, including the cache.
    pub fn reset(&mut self) {
        self.active.clear();
        self.results.clear();
        self.cache.clear();
        self.ticked_counts.clear();
        self.last_update = None;
    }
}
