use crate::types::{BuiltTx, Order, Quote, StatusChange, StatusEvent};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Quoting and transaction building capability. The engine never names a
/// concrete venue implementation.
#[async_trait]
pub trait Router: Send + Sync {
    /// Return the best quote across venues for this order.
    async fn best_quote(&self, order: &Order) -> Result<Quote>;

    /// Build an opaque signed transaction for the quoted route.
    async fn build_tx(&self, order: &Order, quote: &Quote) -> Result<BuiltTx>;
}

/// Submission and confirmation capability.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Submit the transaction; returns the transaction hash.
    async fn submit(&self, tx: &BuiltTx) -> Result<String>;

    /// Wait for the transaction to confirm. Returns
    /// [`crate::EngineError::ConfirmationTimeout`] when the deadline passes.
    async fn await_confirmation(&self, tx_hash: &str, timeout: Duration) -> Result<()>;
}

/// Durable order storage.
///
/// `transition` is a compare-and-set: the write only lands when the row is
/// still in `from`, which is what makes duplicate executions harmless.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &Order) -> Result<()>;

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>>;

    /// Newest-first page of orders.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>>;

    /// Apply `change` iff the row is currently in `from`; returns the
    /// updated row. `updated_at` is refreshed on every successful write.
    async fn transition(
        &self,
        order_id: Uuid,
        from: crate::types::OrderStatus,
        change: StatusChange,
    ) -> Result<Order>;

    /// Move the order to `failed` from any non-terminal state.
    async fn mark_failed(&self, order_id: Uuid, reason: &str) -> Result<Order>;
}

/// Downstream consumer of persisted status transitions. Publication is
/// best-effort: the persisted row stays the source of truth, so failures
/// are swallowed after logging.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, event: StatusEvent);
}
