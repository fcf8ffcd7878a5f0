// src/monitor/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::Config,
    error::MonitorError,
    monitor::{
        channel::{LiveChannel, QuizStore},
        lifecycle::MonitoringSession,
    },
};

/// At most one live `MonitoringSession` per quiz in this process.
///
/// Stopping removes the session, so the next start for the same quiz gets a
/// fresh aggregator and an empty suspected-cheaters cache.
#[derive(Clone)]
pub struct MonitorRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<MonitoringSession>>>>,
    store: Arc<dyn QuizStore>,
    channel: Arc<dyn LiveChannel>,
    config: Config,
}

impl MonitorRegistry {
    pub fn new(store: Arc<dyn QuizStore>, channel: Arc<dyn LiveChannel>, config: Config) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            channel,
            config,
        }
    }

    /// Starts (or joins) monitoring of `quiz_id`.
    /// A failed start is torn down and forgotten so a retry begins clean.
    pub async fn start(&self, quiz_id: &str) -> Result<Arc<MonitoringSession>, MonitorError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(quiz_id.to_string())
                .or_insert_with(|| {
                    Arc::new(MonitoringSession::new(
                        quiz_id,
                        self.store.clone(),
                        self.channel.clone(),
                        &self.config,
                    ))
                })
                .clone()
        };

        match session.start().await {
            Ok(()) => Ok(session),
            Err(e) => {
                self.forget(quiz_id, &session).await;
                session.stop().await;
                Err(e)
            }
        }
    }

    /// Stops monitoring of `quiz_id`. Unknown ids are ignored.
    pub async fn stop(&self, quiz_id: &str) {
        let session = self.sessions.write().await.remove(quiz_id);
        if let Some(session) = session {
            session.stop().await;
        }
    }

    pub async fn get(&self, quiz_id: &str) -> Option<Arc<MonitoringSession>> {
        self.sessions.read().await.get(quiz_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Graceful shutdown: stops every session.
    pub async fn stop_all(&self) {
        let sessions: Vec<Arc<MonitoringSession>> =
            self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.stop().await;
        }
    }

    async fn forget(&self, quiz_id: &str, session: &Arc<MonitoringSession>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(quiz_id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(quiz_id);
        }
    }
}
