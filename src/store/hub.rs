// src/store/hub.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    error::MonitorError,
    models::{result::QuizResult, session::StudentSession},
    monitor::channel::{ChannelEvent, ChannelSink, LiveChannel},
};

/// Everything the hub knows about one quiz. Kept behind a single lock so a
/// publish can never fall between a subscriber's replay and its registration.
#[derive(Debug, Default)]
struct Topic {
    sink: Option<ChannelSink>,
    sessions: Option<Vec<StudentSession>>,
    results: Option<Vec<QuizResult>>,
}

impl Topic {
    /// Sends to the current subscriber, dropping it if its receiver is gone.
    async fn deliver(&mut self, quiz_id: &str, event: ChannelEvent) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        if sink.send(event).await.is_err() {
            tracing::debug!(quiz_id = %quiz_id, "Subscriber went away, dropping it");
            self.sink = None;
            return false;
        }
        true
    }
}

/// In-process live channel.
///
/// Producers publish full snapshots per quiz; the hub forwards them to the
/// subscribed monitoring session, if any. The newest snapshot of each kind is
/// retained and replayed on subscribe, like a real-time listener's first
/// callback.
#[derive(Debug, Default)]
pub struct LiveHub {
    topics: RwLock<HashMap<String, Arc<Mutex<Topic>>>>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a subscriber received the snapshot.
    pub async fn publish_sessions(&self, quiz_id: &str, sessions: Vec<StudentSession>) -> bool {
        let topic = self.topic(quiz_id).await;
        let mut topic = topic.lock().await;
        topic.sessions = Some(sessions.clone());
        topic.deliver(quiz_id, ChannelEvent::Sessions(sessions)).await
    }

    pub async fn publish_results(&self, quiz_id: &str, results: Vec<QuizResult>) -> bool {
        let topic = self.topic(quiz_id).await;
        let mut topic = topic.lock().await;
        topic.results = Some(results.clone());
        topic.deliver(quiz_id, ChannelEvent::Results(results)).await
    }

    /// Breaks the subscription of `quiz_id` with `reason`.
    pub async fn fail(&self, quiz_id: &str, reason: &str) {
        let topic = self.topic(quiz_id).await;
        let sink = topic.lock().await.sink.take();
        if let Some(sink) = sink {
            let _ = sink.send(ChannelEvent::Failed(reason.to_string())).await;
        }
    }

    pub async fn is_subscribed(&self, quiz_id: &str) -> bool {
        let topic = self.topics.read().await.get(quiz_id).cloned();
        match topic {
            Some(topic) => topic.lock().await.sink.is_some(),
            None => false,
        }
    }

    async fn topic(&self, quiz_id: &str) -> Arc<Mutex<Topic>> {
        if let Some(topic) = self.topics.read().await.get(quiz_id) {
            return topic.clone();
        }
        self.topics
            .write()
            .await
            .entry(quiz_id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl LiveChannel for LiveHub {
    async fn start_monitoring(&self, quiz_id: &str, sink: ChannelSink) -> Result<(), MonitorError> {
        let topic = self.topic(quiz_id).await;
        let mut topic = topic.lock().await;

        if let Some(sessions) = topic.sessions.clone() {
            sink.send(ChannelEvent::Sessions(sessions))
                .await
                .map_err(|e| MonitorError::ChannelFailure(e.to_string()))?;
        }
        if let Some(results) = topic.results.clone() {
            sink.send(ChannelEvent::Results(results))
                .await
                .map_err(|e| MonitorError::ChannelFailure(e.to_string()))?;
        }

        if topic.sink.replace(sink).is_some() {
            tracing::warn!(quiz_id = %quiz_id, "Replacing an existing live subscription");
        }
        Ok(())
    }

    async fn stop_monitoring(&self, quiz_id: &str) -> Result<(), MonitorError> {
        let topic = self.topics.read().await.get(quiz_id).cloned();
        if let Some(topic) = topic {
            topic.lock().await.sink = None;
        }
        Ok(())
    }
}
