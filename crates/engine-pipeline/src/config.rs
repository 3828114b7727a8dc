use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// In-flight jobs per execution worker.
    pub execute_concurrency: usize,
    /// Execution jobs per minute per order scope.
    pub execute_rate_limit_per_minute: u32,
    /// In-flight jobs per delivery worker.
    pub delivery_concurrency: usize,
    /// Delivery jobs per minute per worker.
    pub delivery_rate_limit_per_minute: u32,
    /// Wall-clock since the last published event before an order scope is
    /// reaped.
    pub idle_timeout: Duration,
    pub confirmation_timeout: Duration,
    /// Upper bound the publisher waits on the substrate before dropping an
    /// event.
    pub publish_timeout: Duration,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            execute_concurrency: env_parsed("QUEUE_MAX_CONCURRENCY", 10),
            execute_rate_limit_per_minute: env_parsed("QUEUE_RATE_LIMIT_PER_MINUTE", 100),
            delivery_concurrency: env_parsed("WS_WORKER_CONCURRENCY", 50),
            delivery_rate_limit_per_minute: env_parsed("WS_WORKER_RATE_LIMIT", 1000),
            idle_timeout: Duration::from_secs(env_parsed("IDLE_TIMEOUT_SECS", 900)),
            confirmation_timeout: Duration::from_secs(env_parsed("CONFIRMATION_TIMEOUT_SECS", 60)),
            publish_timeout: Duration::from_millis(env_parsed("PUBLISH_TIMEOUT_MS", 2000)),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
