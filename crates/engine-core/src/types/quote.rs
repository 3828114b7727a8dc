use super::DexType;
use rust_decimal::Decimal;

/// Price quote returned by a router for one order.
#[derive(Debug, Clone)]
pub struct Quote {
    pub dex: DexType,
    /// Raw venue price before fees.
    pub quote_price: Decimal,
    /// Quote price less the venue fee; the number compared across venues.
    pub effective_price: Decimal,
    /// Venue fee in basis points.
    pub fee_bps: u32,
    /// Simulated quoting latency.
    pub quote_latency_ms: u64,
}

/// Opaque signed transaction produced by the router.
#[derive(Debug, Clone)]
pub struct BuiltTx {
    pub dex: DexType,
    /// Hex-encoded transaction blob; the engine never inspects it.
    pub blob: String,
}
