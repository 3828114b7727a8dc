use crate::lifecycle::OrderLifecycle;
use async_trait::async_trait;
use engine_queue::{Job, JobHandler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Payload of an execution job. The job key is the order id itself, so a
/// second enqueue of the same order never creates a second job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteJob {
    pub order_id: Uuid,
}

/// Bridges the execution queue to the lifecycle. Errors have already been
/// persisted as `failed` by the lifecycle; here they only feed the queue's
/// retry policy and the logs.
pub struct ExecutionHandler {
    lifecycle: Arc<OrderLifecycle>,
}

impl ExecutionHandler {
    pub fn new(lifecycle: Arc<OrderLifecycle>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl JobHandler for ExecutionHandler {
    async fn handle(&self, job: Job) -> engine_core::Result<()> {
        let exec: ExecuteJob = serde_json::from_str(&job.payload)?;

        self.lifecycle.execute(exec.order_id).await.map_err(|e| {
            error!(order_id = %exec.order_id, error = %e, "Order execution failed");
            e
        })
    }
}
