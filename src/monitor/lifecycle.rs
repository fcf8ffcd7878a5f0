// src/monitor/lifecycle.rs

//! Start/stop control of one monitoring session.
//!
//! A `MonitoringSession` owns everything that lives for exactly one
//! "monitor quiz X" period: the aggregator and its suspected-cheaters cache,
//! the pump task draining the live channel, the 1-second ticker, and the
//! latches that pair `start_monitoring` with `stop_monitoring`.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::{
    sync::{RwLock, broadcast, mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    config::{CHANNEL_BUFFER, Config},
    error::MonitorError,
    models::quiz::QuizRecord,
    monitor::{
        aggregator::SessionAggregator,
        channel::{ChannelEvent, LiveChannel, QuizStore},
        staleness,
        view::MonitorView,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Idle,
    Starting,
    Live,
    /// The live channel broke. The cached view is kept as-is.
    Disconnected,
    NotFound,
    Stopped,
}

/// Signals for the presentation layer. What to do with them (switching to
/// the incidents tab, toasts) is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    NewIncident { student_id: String },
    Disconnected { reason: String },
    Stopped,
}

/// Most recent `NewIncident`, kept for callers that poll instead of subscribing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentAlert {
    pub student_id: String,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub status: MonitorStatus,
    pub quiz: Option<QuizRecord>,
    pub last_incident: Option<IncidentAlert>,
}

struct Shared {
    aggregator: RwLock<SessionAggregator>,
    state: RwLock<SessionState>,
    /// Cleared on stop. Checked before every state mutation so late work is dropped.
    alive: AtomicBool,
}

impl Shared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn set_status(&self, status: MonitorStatus) {
        if self.is_alive() {
            self.state.write().await.status = status;
        }
    }
}

/// Who owns the single `stop_monitoring` call.
enum Subscription {
    /// Never subscribed. `stop` unsubscribes.
    Idle,
    /// `start_monitoring` is in flight. If `stop` lands now, the start path
    /// unsubscribes once the call returns.
    Pending,
    /// Subscribed; the pump is running.
    Active(JoinHandle<()>),
    /// Torn down. Nothing may subscribe or unsubscribe any more.
    Released,
}

enum Settled {
    Live,
    Refused(MonitorError),
    Released,
}

pub struct MonitoringSession {
    quiz_id: String,
    store: Arc<dyn QuizStore>,
    channel: Arc<dyn LiveChannel>,
    tick_interval: Duration,
    stale_window: TimeDelta,
    shared: Arc<Shared>,
    /// Serializes concurrent `start` calls.
    start_gate: tokio::sync::Mutex<()>,
    /// Set only once the subscription call has succeeded.
    started: AtomicBool,
    stopped: AtomicBool,
    shutdown: watch::Sender<bool>,
    subscription: Mutex<Subscription>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitoringSession {
    pub fn new(
        quiz_id: impl Into<String>,
        store: Arc<dyn QuizStore>,
        channel: Arc<dyn LiveChannel>,
        config: &Config,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (events, _) = broadcast::channel(256);
        Self {
            quiz_id: quiz_id.into(),
            store,
            channel,
            tick_interval: config.tick_interval(),
            stale_window: config.stale_window(),
            shared: Arc::new(Shared {
                aggregator: RwLock::new(SessionAggregator::new()),
                state: RwLock::new(SessionState {
                    status: MonitorStatus::Idle,
                    quiz: None,
                    last_incident: None,
                }),
                alive: AtomicBool::new(true),
            }),
            start_gate: tokio::sync::Mutex::new(()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutdown,
            subscription: Mutex::new(Subscription::Idle),
            events,
        }
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> MonitorStatus {
        self.shared.state.read().await.status
    }

    /// Looks the quiz up, heals a stale "in progress" flag, then subscribes to
    /// the live channel. Calling it again after success is a no-op.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let _gate = self.start_gate.lock().await;

        if self.is_stopped() {
            return Err(MonitorError::Stopped);
        }
        if self.is_started() {
            return Ok(());
        }

        self.shared.set_status(MonitorStatus::Starting).await;

        let quiz = match self.store.lookup_quiz(&self.quiz_id).await {
            Ok(Some(quiz)) => quiz,
            Ok(None) => {
                tracing::info!(quiz_id = %self.quiz_id, "Quiz not found, monitoring not started");
                self.shared.set_status(MonitorStatus::NotFound).await;
                return Err(MonitorError::NotFound(self.quiz_id.clone()));
            }
            Err(e) => {
                tracing::error!(quiz_id = %self.quiz_id, "Failed to look up quiz: {}", e);
                self.shared.set_status(MonitorStatus::Idle).await;
                return Err(e);
            }
        };

        let quiz =
            staleness::reconcile(self.store.as_ref(), quiz, Utc::now(), self.stale_window).await;

        // The correcting write may have finished after stop(); its result is discarded.
        if !self.shared.is_alive() {
            return Err(MonitorError::Stopped);
        }
        self.shared.state.write().await.quiz = Some(quiz);

        if !self.claim_subscription() {
            return Err(MonitorError::Stopped);
        }

        let (sink, rx) = mpsc::channel(CHANNEL_BUFFER);
        let subscribed = self.channel.start_monitoring(&self.quiz_id, sink).await;

        // Settle under the lock, act after releasing it.
        let settled = {
            let Ok(mut slot) = self.subscription.lock() else {
                return Err(MonitorError::Stopped);
            };
            let released = matches!(*slot, Subscription::Released);
            match (released, subscribed) {
                (true, _) => {
                    drop(rx);
                    Settled::Released
                }
                (false, Err(e)) => {
                    *slot = Subscription::Idle;
                    Settled::Refused(e)
                }
                (false, Ok(())) => {
                    // Latch and spawn together so stop() always sees the pump.
                    self.started.store(true, Ordering::SeqCst);
                    *slot = Subscription::Active(tokio::spawn(pump(
                        self.quiz_id.clone(),
                        self.shared.clone(),
                        rx,
                        self.shutdown.subscribe(),
                        self.events.clone(),
                        self.tick_interval,
                    )));
                    Settled::Live
                }
            }
        };

        match settled {
            Settled::Live => {}
            Settled::Released => {
                // stop() ran while the subscribe was in flight and left the
                // unsubscribe to us.
                tracing::info!(quiz_id = %self.quiz_id, "Stopped while subscribing, releasing subscription");
                if let Err(e) = self.channel.stop_monitoring(&self.quiz_id).await {
                    tracing::warn!(quiz_id = %self.quiz_id, "Failed to stop monitoring: {}", e);
                }
                return Err(MonitorError::Stopped);
            }
            Settled::Refused(e) => {
                tracing::error!(quiz_id = %self.quiz_id, "Failed to start monitoring: {}", e);
                self.shared.set_status(MonitorStatus::Disconnected).await;
                return Err(match e {
                    MonitorError::ChannelFailure(_) => e,
                    other => MonitorError::ChannelFailure(other.to_string()),
                });
            }
        }

        self.shared.set_status(MonitorStatus::Live).await;
        tracing::info!(quiz_id = %self.quiz_id, "Monitoring started");
        Ok(())
    }

    /// Tears the session down. Exactly one unsubscribe is issued over the
    /// session's life, even if `start` never completed; later calls do nothing.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.alive.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);

        match self.release_subscription() {
            Some(Subscription::Pending) => {
                tracing::debug!(quiz_id = %self.quiz_id, "Subscribe in flight, start will unsubscribe");
            }
            previous => {
                if let Some(Subscription::Active(handle)) = previous {
                    if let Err(e) = handle.await {
                        tracing::warn!(quiz_id = %self.quiz_id, "Pump task ended abnormally: {}", e);
                    }
                }
                if let Err(e) = self.channel.stop_monitoring(&self.quiz_id).await {
                    tracing::warn!(quiz_id = %self.quiz_id, "Failed to stop monitoring: {}", e);
                }
            }
        }

        self.shared.aggregator.write().await.reset();
        self.shared.state.write().await.status = MonitorStatus::Stopped;
        let _ = self.events.send(MonitorEvent::Stopped);

        tracing::info!(quiz_id = %self.quiz_id, "Monitoring stopped");
    }

    /// Builds the caller-facing view as of `now`.
    pub async fn view(&self, now: DateTime<Utc>) -> MonitorView {
        let state = self.shared.state.read().await;
        let aggregator = self.shared.aggregator.read().await;
        MonitorView::build(&self.quiz_id, &state, &aggregator, now)
    }

    /// Moves `Idle` to `Pending`. False once the session was released.
    fn claim_subscription(&self) -> bool {
        match self.subscription.lock() {
            Ok(mut slot) if matches!(*slot, Subscription::Idle) => {
                *slot = Subscription::Pending;
                true
            }
            _ => false,
        }
    }

    fn release_subscription(&self) -> Option<Subscription> {
        self.subscription
            .lock()
            .ok()
            .map(|mut slot| std::mem::replace(&mut *slot, Subscription::Released))
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.alive.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);

        // Only a session that actually subscribed may unsubscribe: the channel
        // is keyed by quiz, and a newer session may own that key by now.
        if !matches!(self.release_subscription(), Some(Subscription::Active(_))) {
            return;
        }

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let channel = self.channel.clone();
            let quiz_id = self.quiz_id.clone();
            runtime.spawn(async move {
                if let Err(e) = channel.stop_monitoring(&quiz_id).await {
                    tracing::warn!(quiz_id = %quiz_id, "Failed to stop monitoring on drop: {}", e);
                }
            });
        } else {
            tracing::warn!(quiz_id = %self.quiz_id, "Session dropped outside a runtime without stop()");
        }
    }
}

/// Drains the live channel and drives the periodic tick until shutdown.
async fn pump(
    quiz_id: String,
    shared: Arc<Shared>,
    mut rx: mpsc::Receiver<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
    events: broadcast::Sender<MonitorEvent>,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = rx.recv() => {
                if !shared.is_alive() {
                    break;
                }
                match event {
                    Some(ChannelEvent::Sessions(snapshot)) => {
                        tracing::debug!(quiz_id = %quiz_id, students = snapshot.len(), "Session snapshot");
                        shared.aggregator.write().await.apply_sessions(snapshot, Utc::now());
                    }
                    Some(ChannelEvent::Results(results)) => {
                        tracing::debug!(quiz_id = %quiz_id, results = results.len(), "Results snapshot");
                        shared.aggregator.write().await.apply_results(&results, Utc::now());
                    }
                    Some(ChannelEvent::Failed(reason)) => {
                        disconnect(&quiz_id, &shared, &events, reason).await;
                        break;
                    }
                    None => {
                        disconnect(&quiz_id, &shared, &events, "channel closed".to_string()).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !shared.is_alive() {
                    break;
                }
                let grown = shared.aggregator.write().await.tick();
                if let Some(latest) = grown.last() {
                    shared.state.write().await.last_incident = Some(IncidentAlert {
                        student_id: latest.clone(),
                        detected_at: Utc::now(),
                    });
                }
                for student_id in grown {
                    tracing::info!(quiz_id = %quiz_id, student_id = %student_id, "New incident detected");
                    let _ = events.send(MonitorEvent::NewIncident { student_id });
                }
            }
        }
    }
}

async fn disconnect(
    quiz_id: &str,
    shared: &Shared,
    events: &broadcast::Sender<MonitorEvent>,
    reason: String,
) {
    tracing::warn!(quiz_id = %quiz_id, "Live channel disconnected: {}", reason);
    shared.set_status(MonitorStatus::Disconnected).await;
    let _ = events.send(MonitorEvent::Disconnected { reason });
}
