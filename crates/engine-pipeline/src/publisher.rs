use crate::routes::RouteTable;
use async_trait::async_trait;
use engine_core::types::StatusEvent;
use engine_core::{now_nanos, StatusSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Enqueues status events onto the emitting order's per-status queue.
///
/// Publication never blocks lifecycle progress beyond `publish_timeout`:
/// on any failure the event is logged and dropped, and the persisted order
/// row remains the source of truth.
pub struct EventPublisher {
    routes: Arc<RouteTable>,
    publish_timeout: Duration,
}

impl EventPublisher {
    pub fn new(routes: Arc<RouteTable>, publish_timeout: Duration) -> Self {
        Self {
            routes,
            publish_timeout,
        }
    }
}

#[async_trait]
impl StatusSink for EventPublisher {
    async fn publish(&self, event: StatusEvent) {
        let order_id = event.order_id;
        let status = event.status;

        let Some(queue) = self.routes.status_queue(order_id, status) else {
            warn!(
                order_id = %order_id,
                status = %status,
                "No live resource scope for event, dropping"
            );
            engine_metrics::counters::events_dropped(1, "no_scope");
            return;
        };

        self.routes.touch(order_id);

        // Wall-clock nanos keep duplicate submissions from ever colliding.
        let key = format!("{}:{}:{}", order_id, status.as_queue_segment(), now_nanos());
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Failed to serialize event, dropping");
                engine_metrics::counters::events_dropped(1, "serialize");
                return;
            }
        };

        match tokio::time::timeout(self.publish_timeout, queue.add(&key, payload)).await {
            Ok(Ok(true)) => {
                engine_metrics::counters::events_published(1);
                debug!(order_id = %order_id, status = %status, "Status event enqueued");
            }
            Ok(Ok(false)) => {
                debug!(order_id = %order_id, status = %status, "Duplicate event key, skipped");
            }
            Ok(Err(e)) => {
                warn!(
                    order_id = %order_id,
                    status = %status,
                    error = %e,
                    "Event enqueue failed, dropping"
                );
                engine_metrics::counters::events_dropped(1, "substrate");
            }
            Err(_) => {
                warn!(
                    order_id = %order_id,
                    status = %status,
                    "Event enqueue timed out, dropping"
                );
                engine_metrics::counters::events_dropped(1, "timeout");
            }
        }
    }
}
