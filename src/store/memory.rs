// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{error::MonitorError, models::quiz::QuizRecord, monitor::channel::QuizStore};

/// Process-local quiz store. Used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryQuizStore {
    quizzes: RwLock<HashMap<String, QuizRecord>>,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, quiz: QuizRecord) {
        self.quizzes.write().await.insert(quiz.id.clone(), quiz);
    }

    pub async fn get(&self, quiz_id: &str) -> Option<QuizRecord> {
        self.quizzes.read().await.get(quiz_id).cloned()
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn lookup_quiz(&self, quiz_id: &str) -> Result<Option<QuizRecord>, MonitorError> {
        Ok(self.get(quiz_id).await)
    }

    async fn correct_stale_quiz_state(&self, quiz_id: &str) -> Result<(), MonitorError> {
        if let Some(quiz) = self.quizzes.write().await.get_mut(quiz_id) {
            quiz.in_progress = false;
            quiz.active_users.clear();
        }
        Ok(())
    }
}
