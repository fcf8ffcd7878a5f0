// src/monitor/channel.rs

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::MonitorError,
    models::{quiz::QuizRecord, result::QuizResult, session::StudentSession},
};

/// Message delivered by the live channel to a subscribed monitoring session.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Latest active-student list of the quiz.
    Sessions(Vec<StudentSession>),
    /// Latest result records of the quiz (may contain duplicates per user).
    Results(Vec<QuizResult>),
    /// The subscription broke after being established.
    Failed(String),
}

pub type ChannelSink = mpsc::Sender<ChannelEvent>;

/// Persistent quiz state the monitor reads and self-heals.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Returns `Ok(None)` when the quiz does not exist.
    async fn lookup_quiz(&self, quiz_id: &str) -> Result<Option<QuizRecord>, MonitorError>;

    /// Clears `in_progress` and `active_users`. Idempotent.
    async fn correct_stale_quiz_state(&self, quiz_id: &str) -> Result<(), MonitorError>;
}

/// Real-time session channel. Snapshots are pushed into `sink` until
/// `stop_monitoring` is called for the same quiz.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    async fn start_monitoring(&self, quiz_id: &str, sink: ChannelSink) -> Result<(), MonitorError>;

    async fn stop_monitoring(&self, quiz_id: &str) -> Result<(), MonitorError>;
}
