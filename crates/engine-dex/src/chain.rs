use async_trait::async_trait;
use engine_core::types::BuiltTx;
use engine_core::{Chain, EngineError, Result};
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

/// Simulated submission client: submission holds the transaction for the
/// execution delay, confirmation lands after a short finality delay.
pub struct SimulatedChain {
    execution_delay_ms: RangeInclusive<u64>,
    finality_delay_ms: RangeInclusive<u64>,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self {
            execution_delay_ms: 2000..=3000,
            finality_delay_ms: 400..=800,
        }
    }

    /// Compressed delays for tests.
    pub fn with_delays(
        execution_delay_ms: RangeInclusive<u64>,
        finality_delay_ms: RangeInclusive<u64>,
    ) -> Self {
        Self {
            execution_delay_ms,
            finality_delay_ms,
        }
    }

    fn random_in(range: &RangeInclusive<u64>) -> u64 {
        rand::thread_rng().gen_range(range.clone())
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Chain for SimulatedChain {
    async fn submit(&self, tx: &BuiltTx) -> Result<String> {
        let delay = Self::random_in(&self.execution_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        let tx_hash: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

        debug!(dex = %tx.dex, tx_hash = %tx_hash, delay_ms = delay, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: &str, timeout: Duration) -> Result<()> {
        let delay = Duration::from_millis(Self::random_in(&self.finality_delay_ms));

        match tokio::time::timeout(timeout, tokio::time::sleep(delay)).await {
            Ok(()) => {
                debug!(tx_hash = %tx_hash, "Transaction confirmed");
                Ok(())
            }
            Err(_) => Err(EngineError::ConfirmationTimeout),
        }
    }
}
