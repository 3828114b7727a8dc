use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL (`redis://` or `rediss://` for TLS).
    pub url: String,

    /// Key prefix for all queue state.
    #[serde(default = "default_prefix")]
    pub key_prefix: String,

    /// Worker poll interval when a queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Threshold after which a still-running job is logged as stalled.
    #[serde(default = "default_stall_warn_ms")]
    pub stall_warn_ms: u64,
}

fn default_prefix() -> String {
    "swap".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_stall_warn_ms() -> u64 {
    30_000
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            key_prefix: std::env::var("QUEUE_KEY_PREFIX").unwrap_or_else(|_| default_prefix()),
            poll_interval_ms: std::env::var("QUEUE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_poll_interval_ms),
            stall_warn_ms: std::env::var("QUEUE_STALL_WARN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_stall_warn_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_warn_after(&self) -> Duration {
        Duration::from_millis(self.stall_warn_ms)
    }
}
