use crate::config::PipelineConfig;
use crate::execution::ExecuteJob;
use crate::routes::{IdleState, RouteTable};
use dashmap::DashMap;
use engine_core::types::OrderStatus;
use engine_core::EngineError;
use engine_queue::{keys, JobHandler, JobOptions, JobQueue, QueueConfig, RedisConnection, Worker, WorkerConfig};
use engine_registry::PushRegistry;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Event priority per status; higher is served first within a queue.
fn status_priority(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Failed => 10,
        OrderStatus::Confirmed => 9,
        OrderStatus::Submitted => 8,
        OrderStatus::Building => 7,
        OrderStatus::Routing => 6,
        OrderStatus::Pending => 5,
    }
}

struct OrderScope {
    conn: RedisConnection,
    execute_queue: JobQueue,
    workers: Vec<Worker>,
    reaper: JoinHandle<()>,
}

struct Inner {
    queue_config: QueueConfig,
    config: PipelineConfig,
    routes: Arc<RouteTable>,
    registry: Arc<PushRegistry>,
    execution_handler: Arc<dyn JobHandler>,
    delivery_handler: Arc<dyn JobHandler>,
    scopes: DashMap<Uuid, OrderScope>,
}

/// Owns every per-order resource bundle: one substrate connection, six
/// status queues with a delivery worker each, one execution queue with its
/// worker, and the idle reaper that tears the bundle down again.
///
/// The manager writes the route table; it never sees the publisher.
#[derive(Clone)]
pub struct ResourceManager {
    inner: Arc<Inner>,
}

impl ResourceManager {
    pub fn new(
        queue_config: QueueConfig,
        config: PipelineConfig,
        routes: Arc<RouteTable>,
        registry: Arc<PushRegistry>,
        execution_handler: Arc<dyn JobHandler>,
        delivery_handler: Arc<dyn JobHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue_config,
                config,
                routes,
                registry,
                execution_handler,
                delivery_handler,
                scopes: DashMap::new(),
            }),
        }
    }

    /// Open the resource bundle for a freshly created order. Allocating an
    /// order that already has a bundle is a no-op.
    pub async fn allocate(&self, order_id: Uuid) -> engine_core::Result<()> {
        if self.inner.scopes.contains_key(&order_id) {
            debug!(order_id = %order_id, "Resource scope already exists");
            return Ok(());
        }

        let conn = RedisConnection::new(self.inner.queue_config.clone())
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))?;

        let prefix = &self.inner.queue_config.key_prefix;
        let poll_interval = self.inner.queue_config.poll_interval();
        let stall_warn_after = self.inner.queue_config.stall_warn_after();

        let delivery_config = WorkerConfig {
            concurrency: self.inner.config.delivery_concurrency,
            rate_limit_per_minute: self.inner.config.delivery_rate_limit_per_minute,
            poll_interval,
            stall_warn_after,
        };
        let execute_config = WorkerConfig {
            concurrency: self.inner.config.execute_concurrency,
            rate_limit_per_minute: self.inner.config.execute_rate_limit_per_minute,
            poll_interval,
            stall_warn_after,
        };

        let mut queues = HashMap::new();
        let mut workers = Vec::with_capacity(OrderStatus::ALL.len() + 1);

        for status in OrderStatus::ALL {
            let queue = JobQueue::new(
                conn.clone(),
                keys::status_queue(prefix, &order_id, status.as_queue_segment()),
                JobOptions {
                    priority: status_priority(status),
                    max_attempts: 3,
                    backoff_base: Duration::from_secs(1),
                    ..JobOptions::default()
                },
            );
            workers.push(Worker::spawn(
                queue.clone(),
                self.inner.delivery_handler.clone(),
                delivery_config.clone(),
            ));
            queues.insert(status, queue);
        }

        let execute_queue = JobQueue::new(
            conn.clone(),
            keys::execute_queue(prefix, &order_id),
            JobOptions {
                priority: 0,
                max_attempts: 3,
                backoff_base: Duration::from_secs(2),
                ..JobOptions::default()
            },
        );
        workers.push(Worker::spawn(
            execute_queue.clone(),
            self.inner.execution_handler.clone(),
            execute_config,
        ));

        let idle = IdleState::new(self.inner.config.idle_timeout);
        self.inner.routes.insert(order_id, queues, idle.clone());

        let reaper = spawn_reaper(&self.inner, order_id, idle);
        self.inner.scopes.insert(
            order_id,
            OrderScope {
                conn,
                execute_queue,
                workers,
                reaper,
            },
        );

        engine_metrics::gauges::scope_opened();
        info!(order_id = %order_id, "Order resource scope allocated");
        Ok(())
    }

    /// Enqueue the execution job for an order. Keyed by order id, so a
    /// duplicate enqueue returns `false` instead of creating a second job.
    pub async fn enqueue_execution(&self, order_id: Uuid) -> engine_core::Result<bool> {
        let queue = self
            .inner
            .scopes
            .get(&order_id)
            .map(|scope| scope.execute_queue.clone())
            .ok_or_else(|| {
                EngineError::Queue(format!("no resource scope for order {order_id}"))
            })?;

        let payload = serde_json::to_string(&ExecuteJob { order_id })?;
        queue
            .add(&order_id.to_string(), payload)
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))
    }

    pub fn has_scope(&self, order_id: Uuid) -> bool {
        self.inner.scopes.contains_key(&order_id)
    }

    /// Tear down every live scope in parallel (process shutdown).
    pub async fn shutdown_all(&self) {
        let ids: Vec<Uuid> = self.inner.scopes.iter().map(|e| *e.key()).collect();
        if ids.is_empty() {
            return;
        }
        info!(scopes = ids.len(), "Tearing down all order resource scopes");

        let tasks = ids.into_iter().map(|order_id| {
            let inner = self.inner.clone();
            async move { Inner::teardown(&inner, order_id, true).await }
        });
        join_all(tasks).await;
    }
}

impl Inner {
    /// Close workers, drop queue state, detach subscribers and release the
    /// substrate connection for one order.
    async fn teardown(inner: &Arc<Inner>, order_id: Uuid, abort_reaper: bool) {
        let Some((_, scope)) = inner.scopes.remove(&order_id) else {
            return;
        };
        inner.routes.remove(order_id);

        if abort_reaper {
            scope.reaper.abort();
        }

        for worker in scope.workers {
            worker.shutdown().await;
        }

        let pattern = keys::scope_pattern(&inner.queue_config.key_prefix, &order_id);
        if let Err(e) = scope.conn.delete_matching(&pattern).await {
            warn!(order_id = %order_id, error = %e, "Failed to delete queue state");
        }

        let closed = inner.registry.close_order(order_id);
        if closed > 0 {
            debug!(order_id = %order_id, closed = closed, "Closed subscriber channels");
        }

        engine_metrics::gauges::scope_closed();
        info!(order_id = %order_id, "Order resource scope torn down");
        // Dropping the scope releases the substrate connection.
    }
}

/// Sleeps until the idle deadline, re-arming whenever the scope is
/// touched; on expiry it reaps the scope and exits.
fn spawn_reaper(inner: &Arc<Inner>, order_id: Uuid, idle: Arc<IdleState>) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        loop {
            let deadline = idle.deadline();
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    if tokio::time::Instant::now() >= idle.deadline() {
                        if let Some(inner) = weak.upgrade() {
                            info!(order_id = %order_id, "Idle timeout reached, reaping order resources");
                            Inner::teardown(&inner, order_id, false).await;
                        }
                        break;
                    }
                }
                _ = idle.wait_touch() => {}
            }
        }
    })
}
