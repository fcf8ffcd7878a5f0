use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    monitor::{channel::QuizStore, registry::MonitorRegistry},
    store::hub::LiveHub,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: MonitorRegistry,
    pub hub: Arc<LiveHub>,
    pub config: Config,
}

impl AppState {
    /// Wires a registry to `store` and a fresh in-process live hub.
    pub fn new(store: Arc<dyn QuizStore>, config: Config) -> Self {
        let hub = Arc::new(LiveHub::new());
        let registry = MonitorRegistry::new(store, hub.clone(), config.clone());
        Self {
            registry,
            hub,
            config,
        }
    }
}

impl FromRef<AppState> for MonitorRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<LiveHub> {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
