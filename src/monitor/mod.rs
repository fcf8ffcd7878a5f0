// src/monitor/mod.rs

pub mod aggregator;
pub mod channel;
pub mod classifier;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod staleness;
pub mod view;
