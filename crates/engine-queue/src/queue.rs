use crate::connection::RedisConnection;
use crate::job::{backoff_delay, pending_score, Job, JobOptions};
use crate::{QueueError, Result};
use engine_core::now_millis;
use std::time::Duration;
use tracing::{debug, warn};

/// One durable queue: a pending ZSET ordered by priority then FIFO, a
/// delayed ZSET for retries, retention ZSETs for finished jobs, and one
/// JSON record per live job.
#[derive(Clone)]
pub struct JobQueue {
    conn: RedisConnection,
    name: String,
    opts: JobOptions,
}

impl JobQueue {
    pub fn new(conn: RedisConnection, name: String, opts: JobOptions) -> Self {
        Self { conn, name, opts }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &JobOptions {
        &self.opts
    }

    fn pending_key(&self) -> String {
        format!("{}:pending", self.name)
    }

    fn delayed_key(&self) -> String {
        format!("{}:delayed", self.name)
    }

    fn completed_key(&self) -> String {
        format!("{}:completed", self.name)
    }

    fn failed_key(&self) -> String {
        format!("{}:failed", self.name)
    }

    fn job_key(&self, key: &str) -> String {
        format!("{}:job:{}", self.name, key)
    }

    /// Enqueue a job. Returns `false` when a job with the same key already
    /// exists (duplicate enqueues are no-ops).
    pub async fn add(&self, key: &str, payload: String) -> Result<bool> {
        let job = Job {
            key: key.to_string(),
            payload,
            priority: self.opts.priority,
            attempts_made: 0,
            max_attempts: self.opts.max_attempts,
            backoff_base_ms: self.opts.backoff_base.as_millis() as u64,
            enqueued_at_ms: now_millis(),
        };
        let raw = serde_json::to_string(&job)?;

        let mut conn = self.conn.get();
        let created: Option<String> = redis::cmd("SET")
            .arg(self.job_key(key))
            .arg(raw)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        if created.is_none() {
            debug!(queue = %self.name, key = %key, "Duplicate job key, skipping enqueue");
            return Ok(false);
        }

        redis::cmd("ZADD")
            .arg(self.pending_key())
            .arg(pending_score(job.priority, job.enqueued_at_ms))
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        Ok(true)
    }

    /// Pop the next ready job, promoting due retries first. Returns `None`
    /// when the queue is empty.
    pub async fn take(&self) -> Result<Option<Job>> {
        let mut conn = self.conn.get();
        let now = now_millis();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.delayed_key())
            .arg(0)
            .arg(now)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        if !due.is_empty() {
            let mut pipe = redis::pipe();
            for key in &due {
                pipe.cmd("ZREM").arg(self.delayed_key()).arg(key).ignore();
                pipe.cmd("ZADD")
                    .arg(self.pending_key())
                    .arg(pending_score(self.opts.priority, now))
                    .arg(key)
                    .ignore();
            }
            pipe.query_async::<()>(&mut conn)
                .await
                .map_err(|e| QueueError::Command(e.to_string()))?;
        }

        let popped: Vec<(String, f64)> = redis::cmd("ZPOPMIN")
            .arg(self.pending_key())
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        let Some((key, _score)) = popped.into_iter().next() else {
            return Ok(None);
        };

        let raw: Option<String> = redis::cmd("GET")
            .arg(self.job_key(&key))
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => {
                warn!(queue = %self.name, key = %key, "Pending entry without job record, dropping");
                Ok(None)
            }
        }
    }

    /// Mark a job done; the key is retained in the completed set until its
    /// retention window lapses.
    pub async fn complete(&self, job: &Job) -> Result<()> {
        let now = now_millis();
        let expires_at = now + self.opts.completed_retention.as_millis() as u64;

        let mut conn = self.conn.get();
        let mut pipe = redis::pipe();
        pipe.cmd("DEL").arg(self.job_key(&job.key)).ignore();
        pipe.cmd("ZADD")
            .arg(self.completed_key())
            .arg(expires_at)
            .arg(&job.key)
            .ignore();
        pipe.cmd("ZREMRANGEBYSCORE")
            .arg(self.completed_key())
            .arg(0)
            .arg(now)
            .ignore();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;
        Ok(())
    }

    /// Record a failed attempt: reschedule with exponential backoff while
    /// attempts remain, otherwise move the key to the failed set.
    pub async fn retry_or_discard(&self, mut job: Job) -> Result<()> {
        job.attempts_made += 1;
        let now = now_millis();
        let mut conn = self.conn.get();

        if job.attempts_made < job.max_attempts {
            let delay = backoff_delay(Duration::from_millis(job.backoff_base_ms), job.attempts_made);
            let ready_at = now + delay.as_millis() as u64;
            let raw = serde_json::to_string(&job)?;

            debug!(
                queue = %self.name,
                key = %job.key,
                attempt = job.attempts_made,
                delay_ms = delay.as_millis() as u64,
                "Rescheduling job"
            );

            let mut pipe = redis::pipe();
            pipe.cmd("SET").arg(self.job_key(&job.key)).arg(raw).ignore();
            pipe.cmd("ZADD")
                .arg(self.delayed_key())
                .arg(ready_at)
                .arg(&job.key)
                .ignore();
            pipe.query_async::<()>(&mut conn)
                .await
                .map_err(|e| QueueError::Command(e.to_string()))?;
        } else {
            let expires_at = now + self.opts.failed_retention.as_millis() as u64;
            warn!(
                queue = %self.name,
                key = %job.key,
                attempts = job.attempts_made,
                "Job exhausted retries"
            );

            let mut pipe = redis::pipe();
            pipe.cmd("DEL").arg(self.job_key(&job.key)).ignore();
            pipe.cmd("ZADD")
                .arg(self.failed_key())
                .arg(expires_at)
                .arg(&job.key)
                .ignore();
            pipe.cmd("ZREMRANGEBYSCORE")
                .arg(self.failed_key())
                .arg(0)
                .arg(now)
                .ignore();
            pipe.query_async::<()>(&mut conn)
                .await
                .map_err(|e| QueueError::Command(e.to_string()))?;
        }
        Ok(())
    }
}
