use crate::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use engine_core::types::{DexType, Order, OrderStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Row model for the orders table
#[derive(Debug, Clone, FromRow)]
pub struct DbOrder {
    pub order_id: Uuid,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub slippage_tolerance: f64,
    pub min_amount_out: Option<Decimal>,
    pub status: String,
    pub dex_type: Option<String>,
    pub executed_price: Option<Decimal>,
    pub tx_hash: Option<String>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbOrder {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            token_in: order.token_in.clone(),
            token_out: order.token_out.clone(),
            amount_in: order.amount_in,
            slippage_tolerance: order.slippage_tolerance,
            min_amount_out: order.min_amount_out,
            status: order.status.as_str().to_string(),
            dex_type: order.dex_type.map(|d| d.as_str().to_string()),
            executed_price: order.executed_price,
            tx_hash: order.tx_hash.clone(),
            error_reason: order.error_reason.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    pub fn into_order(self) -> Result<Order> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::CorruptRow(self.order_id, format!("unknown status {:?}", self.status))
        })?;

        let dex_type = match self.dex_type.as_deref() {
            Some(raw) => Some(DexType::parse(raw).ok_or_else(|| {
                DatabaseError::CorruptRow(self.order_id, format!("unknown dex {:?}", raw))
            })?),
            None => None,
        };

        Ok(Order {
            order_id: self.order_id,
            token_in: self.token_in,
            token_out: self.token_out,
            amount_in: self.amount_in,
            slippage_tolerance: self.slippage_tolerance,
            min_amount_out: self.min_amount_out,
            status,
            dex_type,
            executed_price: self.executed_price,
            tx_hash: self.tx_hash,
            error_reason: self.error_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_round_trip() {
        let order = Order::new(
            "SOL".to_string(),
            "USDC".to_string(),
            dec!(1.5),
            0.5,
            Some(dec!(140)),
        );
        let row = DbOrder::from_order(&order);
        assert_eq!(row.status, "pending");

        let back = row.into_order().unwrap();
        assert_eq!(back.order_id, order.order_id);
        assert_eq!(back.amount_in, dec!(1.5));
        assert_eq!(back.status, OrderStatus::Pending);
        assert_eq!(back.min_amount_out, Some(dec!(140)));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let order = Order::new("SOL".into(), "USDC".into(), dec!(1), 1.0, None);
        let mut row = DbOrder::from_order(&order);
        row.status = "exploded".to_string();
        assert!(row.into_order().is_err());
    }

    #[test]
    fn test_dex_tag_round_trip() {
        let mut order = Order::new("SOL".into(), "USDC".into(), dec!(1), 1.0, None);
        order.dex_type = Some(DexType::Meteora);
        let row = DbOrder::from_order(&order);
        assert_eq!(row.dex_type.as_deref(), Some("meteora"));
        assert_eq!(row.into_order().unwrap().dex_type, Some(DexType::Meteora));
    }
}
