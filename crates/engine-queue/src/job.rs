use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-queue job policy.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Higher priority is served first within the queue.
    pub priority: u8,
    pub max_attempts: u32,
    /// First retry delay; doubled on every subsequent attempt.
    pub backoff_base: Duration,
    pub completed_retention: Duration,
    pub failed_retention: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            completed_retention: Duration::from_secs(3600),
            failed_retention: Duration::from_secs(86_400),
        }
    }
}

/// Durable job record stored alongside the queue's pending set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub key: String,
    pub payload: String,
    pub priority: u8,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub enqueued_at_ms: u64,
}

/// Exponential backoff: base, 2x base, 4x base, ...
pub fn backoff_delay(base: Duration, attempts_made: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempts_made.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Priority band width for pending-set scores. Wide enough that wall-clock
/// millis never bleed into the next band.
const PRIORITY_BAND: u64 = 1 << 44;

/// ZSET score ordering pending jobs: priority first, FIFO within a
/// priority. Lower score pops first.
pub fn pending_score(priority: u8, now_ms: u64) -> f64 {
    ((255 - priority as u64) * PRIORITY_BAND + now_ms) as f64
}
