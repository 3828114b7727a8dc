use async_trait::async_trait;
use engine_core::types::{BuiltTx, DexType, Order, Quote};
use engine_core::{EngineError, Result, Router};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::debug;

/// Venue parameters for the simulated router.
#[derive(Debug, Clone, Copy)]
struct Venue {
    dex: DexType,
    fee_bps: u32,
    latency_ms: (u64, u64),
}

const VENUES: [Venue; 2] = [
    Venue {
        dex: DexType::Raydium,
        fee_bps: 25,
        latency_ms: (40, 120),
    },
    Venue {
        dex: DexType::Meteora,
        fee_bps: 20,
        latency_ms: (60, 180),
    },
];

/// Mid price per pair; unknown pairs trade at par.
fn base_price(token_in: &str, token_out: &str) -> Decimal {
    match (token_in, token_out) {
        ("SOL", "USDC") | ("SOL", "USDT") => dec!(150),
        ("USDC", "SOL") | ("USDT", "SOL") => dec!(0.00666667),
        ("BONK", "USDC") => dec!(0.000021),
        ("USDC", "BONK") => dec!(47619),
        ("RAY", "USDC") => dec!(2.4),
        ("USDC", "RAY") => dec!(0.41666667),
        ("USDC", "USDT") | ("USDT", "USDC") => dec!(1),
        _ => dec!(1),
    }
}

/// Quotes both venues concurrently and picks the best effective price.
pub struct SimulatedRouter;

impl SimulatedRouter {
    pub fn new() -> Self {
        Self
    }

    async fn venue_quote(venue: Venue, order: &Order) -> Quote {
        let (lat_min, lat_max) = venue.latency_ms;
        let (latency, jitter) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(lat_min..=lat_max),
                rng.gen_range(-0.02f64..0.02f64),
            )
        };
        tokio::time::sleep(Duration::from_millis(latency)).await;

        let base = base_price(&order.token_in, &order.token_out);
        let jitter = Decimal::from_f64(jitter).unwrap_or_default();
        let quote_price = base * (Decimal::ONE + jitter);
        let fee = Decimal::from(venue.fee_bps) / dec!(10000);
        let effective_price = quote_price * (Decimal::ONE - fee);

        Quote {
            dex: venue.dex,
            quote_price,
            effective_price,
            fee_bps: venue.fee_bps,
            quote_latency_ms: latency,
        }
    }
}

impl Default for SimulatedRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for SimulatedRouter {
    async fn best_quote(&self, order: &Order) -> Result<Quote> {
        let (a, b) = tokio::join!(
            Self::venue_quote(VENUES[0], order),
            Self::venue_quote(VENUES[1], order)
        );

        let best = if a.effective_price >= b.effective_price {
            a
        } else {
            b
        };

        debug!(
            order_id = %order.order_id,
            dex = %best.dex,
            effective_price = %best.effective_price,
            "Best quote selected"
        );

        if let Some(min_out) = order.min_amount_out {
            let projected_out = order.amount_in * best.effective_price;
            if projected_out < min_out {
                return Err(EngineError::Router(format!(
                    "best route output {} below minimum {}",
                    projected_out.round_dp(8),
                    min_out
                )));
            }
        }

        Ok(best)
    }

    async fn build_tx(&self, order: &Order, quote: &Quote) -> Result<BuiltTx> {
        // Simulated serialization work.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut bytes = [0u8; 96];
        rand::thread_rng().fill(&mut bytes[..]);
        let blob: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

        debug!(order_id = %order.order_id, dex = %quote.dex, "Transaction built");

        Ok(BuiltTx {
            dex: quote.dex,
            blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(min_amount_out: Option<Decimal>) -> Order {
        Order::new(
            "SOL".to_string(),
            "USDC".to_string(),
            dec!(1.5),
            0.5,
            min_amount_out,
        )
    }

    #[tokio::test]
    async fn test_effective_price_is_fee_adjusted() {
        let router = SimulatedRouter::new();
        let quote = router.best_quote(&order(None)).await.unwrap();

        assert!(quote.quote_price > Decimal::ZERO);
        assert!(quote.effective_price < quote.quote_price);

        let fee = Decimal::from(quote.fee_bps) / dec!(10000);
        assert_eq!(quote.effective_price, quote.quote_price * (Decimal::ONE - fee));
    }

    #[tokio::test]
    async fn test_min_amount_out_rejects_poor_route() {
        let router = SimulatedRouter::new();
        // 1.5 SOL can never produce a million USDC.
        let err = router
            .best_quote(&order(Some(dec!(1000000))))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Router(_)));
    }

    #[tokio::test]
    async fn test_built_tx_is_hex_blob() {
        let router = SimulatedRouter::new();
        let o = order(None);
        let quote = router.best_quote(&o).await.unwrap();
        let tx = router.build_tx(&o, &quote).await.unwrap();

        assert_eq!(tx.dex, quote.dex);
        assert_eq!(tx.blob.len(), 192);
        assert!(tx.blob.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
