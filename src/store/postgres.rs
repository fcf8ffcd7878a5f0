// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::{error::MonitorError, models::quiz::QuizRecord, monitor::channel::QuizStore};

/// Row shape of the `quizzes` table.
#[derive(Debug, FromRow)]
struct QuizRow {
    id: String,
    title: String,
    question_count: i32,
    time_limit_minutes: Option<i32>,
    in_progress: bool,
    active_users: Vec<String>,
    last_active_timestamp: Option<DateTime<Utc>>,
}

impl From<QuizRow> for QuizRecord {
    fn from(row: QuizRow) -> Self {
        QuizRecord {
            id: row.id,
            title: row.title,
            question_count: u32::try_from(row.question_count).unwrap_or(0),
            time_limit_minutes: row.time_limit_minutes.and_then(|m| u32::try_from(m).ok()),
            in_progress: row.in_progress,
            active_users: row.active_users,
            last_active_timestamp: row.last_active_timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn lookup_quiz(&self, quiz_id: &str) -> Result<Option<QuizRecord>, MonitorError> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT
                id,
                title,
                question_count,
                time_limit_minutes,
                in_progress,
                active_users,
                last_active_timestamp
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
            MonitorError::from(e)
        })?;

        Ok(row.map(QuizRecord::from))
    }

    async fn correct_stale_quiz_state(&self, quiz_id: &str) -> Result<(), MonitorError> {
        sqlx::query(
            r#"
            UPDATE quizzes
            SET in_progress = FALSE,
                active_users = '{}'
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .execute(&self.pool)
        .await
        .map_err(|e| MonitorError::StaleStateWriteFailure(e.to_string()))?;

        Ok(())
    }
}
