use super::{DexType, Order, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status transition record flowing through status queues and out to
/// subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex_type: Option<DexType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Snapshot the order row into an event; the timestamp is the time of
    /// the last persisted write.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            dex_type: order.dex_type,
            executed_price: order.executed_price,
            tx_hash: order.tx_hash.clone(),
            error_reason: order.error_reason.clone(),
            timestamp: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub order_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PongFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Frame written to a push channel. `Connected` and `Pong` carry an
/// explicit `type` tag; status updates are sent bare.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WireFrame {
    Connected(ConnectedFrame),
    Pong(PongFrame),
    StatusUpdate(StatusEvent),
}

impl WireFrame {
    pub fn connected(order_id: Uuid) -> Self {
        Self::Connected(ConnectedFrame {
            kind: "connected",
            order_id,
            timestamp: Utc::now(),
        })
    }

    pub fn pong() -> Self {
        Self::Pong(PongFrame {
            kind: "pong",
            timestamp: Utc::now(),
        })
    }

    pub fn update(event: StatusEvent) -> Self {
        Self::StatusUpdate(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_connected_frame_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(WireFrame::connected(id)).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["orderId"], id.to_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_pong_frame_shape() {
        let json = serde_json::to_value(WireFrame::pong()).unwrap();
        assert_eq!(json["type"], "pong");
    }

    #[test]
    fn test_status_update_omits_unset_fields() {
        let event = StatusEvent {
            order_id: Uuid::new_v4(),
            status: OrderStatus::Routing,
            dex_type: None,
            executed_price: None,
            tx_hash: None,
            error_reason: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(WireFrame::update(event)).unwrap();
        assert_eq!(json["status"], "routing");
        assert!(json.get("type").is_none());
        assert!(json.get("dexType").is_none());
        assert!(json.get("txHash").is_none());
        assert!(json.get("errorReason").is_none());
    }

    #[test]
    fn test_status_update_carries_terminal_fields() {
        let event = StatusEvent {
            order_id: Uuid::new_v4(),
            status: OrderStatus::Confirmed,
            dex_type: Some(DexType::Raydium),
            executed_price: Some(dec!(151.23000000)),
            tx_hash: Some("ab".repeat(32)),
            error_reason: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(WireFrame::update(event)).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["dexType"], "raydium");
        assert_eq!(json["executedPrice"], "151.23000000");
        assert!(json["txHash"].is_string());
    }

    #[test]
    fn test_event_round_trip() {
        let event = StatusEvent {
            order_id: Uuid::new_v4(),
            status: OrderStatus::Failed,
            dex_type: None,
            executed_price: None,
            tx_hash: None,
            error_reason: Some("DEX routing failed: no route".to_string()),
            timestamp: Utc::now(),
        };
        let raw = serde_json::to_string(&event).unwrap();
        let back: StatusEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.order_id, event.order_id);
        assert_eq!(back.status, OrderStatus::Failed);
        assert_eq!(back.error_reason.as_deref(), Some("DEX routing failed: no route"));
    }
}
