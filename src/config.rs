// src/config.rs

use std::env;
use std::time::Duration;

use chrono::TimeDelta;
use dotenvy::dotenv;

/// How often the aggregator re-merges and checks for new incidents.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// An "in progress" quiz with no activity inside this window is treated as stale.
pub const DEFAULT_STALE_WINDOW_MINUTES: i64 = 180;

/// Capacity of the per-session channel between the live hub and the pump task.
pub const CHANNEL_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. The in-memory store is used when absent.
    pub database_url: Option<String>,
    pub rust_log: String,
    pub bind_addr: String,
    pub tick_interval_ms: u64,
    pub stale_window_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let tick_interval_ms = env::var("MONITOR_TICK_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TICK_MS);

        let stale_window_minutes = env::var("STALE_WINDOW_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_STALE_WINDOW_MINUTES);

        Self {
            database_url,
            rust_log,
            bind_addr,
            tick_interval_ms,
            stale_window_minutes,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn stale_window(&self) -> TimeDelta {
        TimeDelta::minutes(self.stale_window_minutes)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            rust_log: "info".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            tick_interval_ms: DEFAULT_TICK_MS,
            stale_window_minutes: DEFAULT_STALE_WINDOW_MINUTES,
        }
    }
}
