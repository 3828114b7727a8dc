use crate::job::Job;
use crate::queue::JobQueue;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Handles one dequeued job. Errors are retried by the owning queue's
/// backoff policy.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> engine_core::Result<()>;
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Max in-flight jobs for this worker.
    pub concurrency: usize,
    /// Max jobs started per rolling minute.
    pub rate_limit_per_minute: u32,
    pub poll_interval: Duration,
    pub stall_warn_after: Duration,
}

impl WorkerConfig {
    pub fn new(concurrency: usize, rate_limit_per_minute: u32) -> Self {
        Self {
            concurrency,
            rate_limit_per_minute,
            poll_interval: Duration::from_millis(250),
            stall_warn_after: Duration::from_secs(30),
        }
    }
}

/// Fixed one-minute window limiter.
struct RateWindow {
    limit: u32,
    count: u32,
    window_start: Instant,
}

impl RateWindow {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Whether a job may start right now. Only started jobs consume a
    /// token, so idle polling is never throttled.
    fn would_allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= Duration::from_secs(60) {
            self.window_start = now;
            self.count = 0;
        }
        self.count < self.limit
    }

    fn consume(&mut self) {
        self.count += 1;
    }

    fn until_reset(&self) -> Duration {
        (self.window_start + Duration::from_secs(60)).saturating_duration_since(Instant::now())
    }
}

/// Long-running consumer of one queue. Dequeued jobs run on spawned tasks
/// bounded by a semaphore; shutdown drains in-flight work.
pub struct Worker {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    pub fn spawn(queue: JobQueue, handler: Arc<dyn JobHandler>, config: WorkerConfig) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(queue, handler, config, shutdown_rx));
        Self { shutdown, handle }
    }

    /// Stop polling and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Worker task panicked during shutdown");
        }
    }
}

async fn run_loop(
    queue: JobQueue,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut limiter = RateWindow::new(config.rate_limit_per_minute);

    loop {
        if *shutdown.borrow() {
            break;
        }

        if !limiter.would_allow() {
            debug!(queue = %queue.name(), "Rate limit reached, backing off");
            tokio::select! {
                _ = tokio::time::sleep(limiter.until_reset()) => {}
                _ = shutdown.changed() => {}
            }
            continue;
        }

        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shutdown.changed() => continue,
        };

        match queue.take().await {
            Ok(Some(job)) => {
                limiter.consume();
                let queue = queue.clone();
                let handler = handler.clone();
                let stall = config.stall_warn_after;
                tokio::spawn(async move {
                    let _permit = permit;
                    run_job(&queue, handler.as_ref(), job, stall).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tokio::select! {
                    _ = tokio::time::sleep(config.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Err(e) => {
                drop(permit);
                warn!(queue = %queue.name(), error = %e, "Queue poll failed");
                tokio::select! {
                    _ = tokio::time::sleep(config.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    // Drain: wait until every in-flight job has released its permit.
    let _ = semaphore.acquire_many(config.concurrency as u32).await;
    debug!(queue = %queue.name(), "Worker drained");
}

async fn run_job(queue: &JobQueue, handler: &dyn JobHandler, job: Job, stall: Duration) {
    let fut = handler.handle(job.clone());
    tokio::pin!(fut);

    // A stalled job gets a warning, never an abort.
    let result = tokio::select! {
        result = &mut fut => result,
        _ = tokio::time::sleep(stall) => {
            warn!(queue = %queue.name(), key = %job.key, "Job exceeded stall threshold, still running");
            fut.await
        }
    };

    match result {
        Ok(()) => {
            if let Err(e) = queue.complete(&job).await {
                warn!(queue = %queue.name(), key = %job.key, error = %e, "Failed to commit job");
            }
        }
        Err(e) => {
            warn!(queue = %queue.name(), key = %job.key, error = %e, "Job handler failed");
            if let Err(e) = queue.retry_or_discard(job).await {
                warn!(queue = %queue.name(), error = %e, "Failed to reschedule job");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rate_window_resets_each_minute() {
        let mut limiter = RateWindow::new(2);
        assert!(limiter.would_allow());
        limiter.consume();
        assert!(limiter.would_allow());
        limiter.consume();
        assert!(!limiter.would_allow());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.would_allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_window_checks_do_not_consume() {
        let mut limiter = RateWindow::new(1);
        for _ in 0..10 {
            assert!(limiter.would_allow());
        }
        limiter.consume();
        assert!(!limiter.would_allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_window_until_reset_counts_down() {
        let mut limiter = RateWindow::new(1);
        limiter.consume();
        tokio::time::advance(Duration::from_secs(20)).await;
        let remaining = limiter.until_reset();
        assert!(remaining <= Duration::from_secs(40));
        assert!(remaining > Duration::from_secs(30));
    }
}
