use async_trait::async_trait;
use engine_core::types::{StatusEvent, WireFrame};
use engine_queue::{Job, JobHandler};
use engine_registry::PushRegistry;
use std::sync::Arc;
use tracing::debug;

/// Drains a per-status queue into the push registry.
///
/// A delivery count of zero is still success: subscribers may simply have
/// disconnected, and the persisted row carries the state either way.
pub struct DeliveryHandler {
    registry: Arc<PushRegistry>,
}

impl DeliveryHandler {
    pub fn new(registry: Arc<PushRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl JobHandler for DeliveryHandler {
    async fn handle(&self, job: Job) -> engine_core::Result<()> {
        let event: StatusEvent = serde_json::from_str(&job.payload)?;
        let order_id = event.order_id;
        let status = event.status;

        let delivered = self.registry.emit(order_id, &WireFrame::update(event));
        debug!(
            order_id = %order_id,
            status = %status,
            delivered = delivered,
            "Status frame fanned out"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::types::OrderStatus;
    use uuid::Uuid;

    fn job_for(event: &StatusEvent) -> Job {
        Job {
            key: format!("{}:{}:1", event.order_id, event.status.as_queue_segment()),
            payload: serde_json::to_string(event).unwrap(),
            priority: 9,
            attempts_made: 0,
            max_attempts: 3,
            backoff_base_ms: 1000,
            enqueued_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_delivers_frame_to_subscriber() {
        let registry = Arc::new(PushRegistry::new(16));
        let order_id = Uuid::new_v4();
        let (_id, mut rx) = registry.register(order_id);

        let handler = DeliveryHandler::new(registry);
        let event = StatusEvent {
            order_id,
            status: OrderStatus::Submitted,
            dex_type: None,
            executed_price: None,
            tx_hash: Some("cd".repeat(32)),
            error_reason: None,
            timestamp: Utc::now(),
        };

        handler.handle(job_for(&event)).await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"submitted\""));
        assert!(frame.contains("txHash"));
    }

    #[tokio::test]
    async fn test_no_subscribers_is_still_success() {
        let registry = Arc::new(PushRegistry::new(16));
        let handler = DeliveryHandler::new(registry);

        let event = StatusEvent {
            order_id: Uuid::new_v4(),
            status: OrderStatus::Confirmed,
            dex_type: None,
            executed_price: None,
            tx_hash: None,
            error_reason: None,
            timestamp: Utc::now(),
        };

        handler.handle(job_for(&event)).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_errors_for_retry() {
        let registry = Arc::new(PushRegistry::new(16));
        let handler = DeliveryHandler::new(registry);

        let job = Job {
            key: "bad".to_string(),
            payload: "not json".to_string(),
            priority: 5,
            attempts_made: 0,
            max_attempts: 3,
            backoff_base_ms: 1000,
            enqueued_at_ms: 0,
        };
        assert!(handler.handle(job).await.is_err());
    }
}
