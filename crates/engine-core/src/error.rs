use crate::types::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Routing error: {0}")]
    Router(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Refused transition for {order_id}: {from} -> {to}")]
    TransitionRefused {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Transaction confirmation timeout")]
    ConfirmationTimeout,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
