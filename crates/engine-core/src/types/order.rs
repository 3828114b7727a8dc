use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a swap order.
///
/// Transitions are forward-only: `Pending -> Routing -> Building ->
/// Submitted -> Confirmed`, with `Failed` reachable from every
/// non-terminal state. `Confirmed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Routing,
    Building,
    Submitted,
    Confirmed,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Routing,
        OrderStatus::Building,
        OrderStatus::Submitted,
        OrderStatus::Confirmed,
        OrderStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Routing => "routing",
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Queue name segment, e.g. `status/CONFIRMED`.
    pub fn as_queue_segment(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Routing => "ROUTING",
            Self::Building => "BUILDING",
            Self::Submitted => "SUBMITTED",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "routing" => Some(Self::Routing),
            "building" => Some(Self::Building),
            "submitted" => Some(Self::Submitted),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether `self` is a legal direct successor of `prev`.
    pub fn follows(&self, prev: OrderStatus) -> bool {
        match self {
            Self::Pending => false,
            Self::Routing => prev == Self::Pending,
            Self::Building => prev == Self::Routing,
            Self::Submitted => prev == Self::Building,
            Self::Confirmed => prev == Self::Submitted,
            Self::Failed => !prev.is_terminal(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Venue selected for an order at the building stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexType {
    Raydium,
    Meteora,
}

impl DexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raydium => "raydium",
            Self::Meteora => "meteora",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raydium" => Some(Self::Raydium),
            "meteora" => Some(Self::Meteora),
            _ => None,
        }
    }
}

impl std::fmt::Display for DexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A market swap order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: Uuid,
    pub token_in: String,
    pub token_out: String,
    /// Input amount, serialized as a decimal string.
    pub amount_in: Decimal,
    /// Slippage tolerance in percent, within [0, 100].
    pub slippage_tolerance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount_out: Option<Decimal>,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dex_type: Option<DexType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a fresh pending order with a new id.
    pub fn new(
        token_in: String,
        token_out: String,
        amount_in: Decimal,
        slippage_tolerance: f64,
        min_amount_out: Option<Decimal>,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: Uuid::new_v4(),
            token_in,
            token_out,
            amount_in,
            slippage_tolerance,
            min_amount_out,
            status: OrderStatus::Pending,
            dex_type: None,
            executed_price: None,
            tx_hash: None,
            error_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Payload of a single persisted status transition.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Routing,
    Building { dex: DexType },
    Submitted { tx_hash: String },
    Confirmed { executed_price: Decimal },
    Failed { reason: String },
}

impl StatusChange {
    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Routing => OrderStatus::Routing,
            Self::Building { .. } => OrderStatus::Building,
            Self::Submitted { .. } => OrderStatus::Submitted,
            Self::Confirmed { .. } => OrderStatus::Confirmed,
            Self::Failed { .. } => OrderStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        use OrderStatus::*;

        assert!(Routing.follows(Pending));
        assert!(Building.follows(Routing));
        assert!(Submitted.follows(Building));
        assert!(Confirmed.follows(Submitted));

        // No skipping or going backwards
        assert!(!Building.follows(Pending));
        assert!(!Confirmed.follows(Building));
        assert!(!Pending.follows(Routing));
        assert!(!Routing.follows(Building));
    }

    #[test]
    fn test_failed_from_any_non_terminal() {
        use OrderStatus::*;

        for from in [Pending, Routing, Building, Submitted] {
            assert!(Failed.follows(from));
        }
        assert!(!Failed.follows(Confirmed));
        assert!(!Failed.follows(Failed));
    }

    #[test]
    fn test_status_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("unknown"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }
}
