use engine_core::types::{Order, OrderStatus, Quote, StatusChange, StatusEvent};
use engine_core::{Chain, EngineError, OrderStore, Result, Router, StatusSink};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Drives one order through routing, building, submission and
/// confirmation, persisting every transition and handing each persisted
/// row to the status sink.
///
/// Execution is serialized per order by the single-key execution queue;
/// the store's compare-and-set transitions make any straggler a no-op.
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    router: Arc<dyn Router>,
    chain: Arc<dyn Chain>,
    sink: Arc<dyn StatusSink>,
    confirmation_timeout: Duration,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn OrderStore>,
        router: Arc<dyn Router>,
        chain: Arc<dyn Chain>,
        sink: Arc<dyn StatusSink>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            router,
            chain,
            sink,
            confirmation_timeout,
        }
    }

    /// Run the full lifecycle for `order_id`. Stage failures land in
    /// `failed` with the reason persisted and emitted before the error is
    /// returned to the execution worker.
    pub async fn execute(&self, order_id: Uuid) -> Result<()> {
        let Some(order) = self.store.get(order_id).await? else {
            warn!(order_id = %order_id, "Execution job for unknown order");
            return Err(EngineError::OrderNotFound(order_id));
        };

        if order.status.is_terminal() {
            debug!(order_id = %order_id, status = %order.status, "Order already terminal, skipping");
            return Ok(());
        }
        if order.status != OrderStatus::Pending {
            warn!(
                order_id = %order_id,
                status = %order.status,
                "Order already in flight, skipping duplicate execution"
            );
            return Ok(());
        }

        info!(
            order_id = %order_id,
            token_in = %order.token_in,
            token_out = %order.token_out,
            amount_in = %order.amount_in,
            "Executing order"
        );

        let quote = match self.router.best_quote(&order).await {
            Ok(quote) => quote,
            Err(e) => return Err(self.fail(order_id, format!("DEX routing failed: {e}")).await),
        };
        self.advance(order_id, OrderStatus::Pending, StatusChange::Routing)
            .await?;

        let tx = match self.router.build_tx(&order, &quote).await {
            Ok(tx) => tx,
            Err(e) => {
                return Err(self
                    .fail(order_id, format!("Transaction building failed: {e}"))
                    .await)
            }
        };
        self.advance(
            order_id,
            OrderStatus::Routing,
            StatusChange::Building { dex: quote.dex },
        )
        .await?;

        let tx_hash = match self.chain.submit(&tx).await {
            Ok(hash) => hash,
            Err(e) => {
                return Err(self
                    .fail(order_id, format!("Transaction submission failed: {e}"))
                    .await)
            }
        };
        self.advance(
            order_id,
            OrderStatus::Building,
            StatusChange::Submitted {
                tx_hash: tx_hash.clone(),
            },
        )
        .await?;

        match self
            .chain
            .await_confirmation(&tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(()) => {
                let executed_price = compute_executed_price(&quote, order.slippage_tolerance);
                self.advance(
                    order_id,
                    OrderStatus::Submitted,
                    StatusChange::Confirmed { executed_price },
                )
                .await?;
                engine_metrics::counters::orders_confirmed(1);
                info!(
                    order_id = %order_id,
                    tx_hash = %tx_hash,
                    executed_price = %executed_price,
                    "Order confirmed"
                );
                Ok(())
            }
            Err(EngineError::ConfirmationTimeout) => Err(self
                .fail(order_id, "Transaction confirmation timeout".to_string())
                .await),
            Err(e) => Err(self.fail(order_id, format!("Transaction failed: {e}")).await),
        }
    }

    /// Persist one forward transition, then hand the updated row to the
    /// sink. Store errors get a single direct retry.
    async fn advance(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> Result<Order> {
        let order = match self
            .store
            .transition(order_id, from, change.clone())
            .await
        {
            Ok(order) => order,
            Err(EngineError::Store(e)) => {
                warn!(order_id = %order_id, error = %e, "Store write failed, retrying once");
                self.store.transition(order_id, from, change).await?
            }
            Err(e) => return Err(e),
        };

        self.sink.publish(StatusEvent::from_order(&order)).await;
        Ok(order)
    }

    /// Persist `failed` and emit the terminal event before surfacing the
    /// error. A failed store write is retried once, bypassing publication.
    async fn fail(&self, order_id: Uuid, reason: String) -> EngineError {
        let order = match self.store.mark_failed(order_id, &reason).await {
            Ok(order) => Some(order),
            Err(first) => {
                warn!(
                    order_id = %order_id,
                    error = %first,
                    "Failed to persist failure, retrying store write once"
                );
                match self.store.mark_failed(order_id, &reason).await {
                    Ok(order) => Some(order),
                    Err(e) => {
                        error!(order_id = %order_id, error = %e, "Could not persist failed status");
                        None
                    }
                }
            }
        };

        if let Some(order) = order {
            engine_metrics::counters::orders_failed(1);
            self.sink.publish(StatusEvent::from_order(&order)).await;
        }

        error!(order_id = %order_id, reason = %reason, "Order failed");
        EngineError::Execution(reason)
    }
}

/// Executed price under the slippage rule. When observed slippage exceeds
/// the tolerance the price is clamped to the tolerance bound; otherwise a
/// uniform microvariance below 0.1% is applied. Reported with 8 fractional
/// digits.
pub fn compute_executed_price(quote: &Quote, slippage_tolerance: f64) -> Decimal {
    let effective = quote.effective_price;
    if effective.is_zero() {
        return Decimal::ZERO;
    }

    let hundred = dec!(100);
    let observed = ((quote.quote_price - effective).abs() / effective) * hundred;
    let tolerance = Decimal::from_f64(slippage_tolerance).unwrap_or_default();

    let price = if observed > tolerance {
        effective * (Decimal::ONE - tolerance / hundred)
    } else {
        let microvariance = rand::thread_rng().gen_range(0.0f64..0.001);
        effective * (Decimal::ONE - Decimal::from_f64(microvariance).unwrap_or_default())
    };

    let mut price = price.round_dp(8);
    price.rescale(8);
    price
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dashmap::DashMap;
    use engine_core::types::{BuiltTx, DexType};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MemStore {
        orders: DashMap<Uuid, Order>,
        failing_writes: AtomicU32,
    }

    impl MemStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                orders: DashMap::new(),
                failing_writes: AtomicU32::new(0),
            })
        }

        fn fail_next_writes(&self, count: u32) {
            self.failing_writes.store(count, Ordering::SeqCst);
        }

        fn maybe_fail(&self) -> Result<()> {
            let remaining = self.failing_writes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failing_writes.store(remaining - 1, Ordering::SeqCst);
                return Err(EngineError::Store("injected write failure".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl OrderStore for MemStore {
        async fn create(&self, order: &Order) -> Result<()> {
            self.orders.insert(order.order_id, order.clone());
            Ok(())
        }

        async fn get(&self, order_id: Uuid) -> Result<Option<Order>> {
            Ok(self.orders.get(&order_id).map(|o| o.clone()))
        }

        async fn list(&self, _limit: i64, _offset: i64) -> Result<Vec<Order>> {
            Ok(self.orders.iter().map(|o| o.clone()).collect())
        }

        async fn transition(
            &self,
            order_id: Uuid,
            from: OrderStatus,
            change: StatusChange,
        ) -> Result<Order> {
            self.maybe_fail()?;
            let mut entry = self
                .orders
                .get_mut(&order_id)
                .ok_or(EngineError::OrderNotFound(order_id))?;
            if entry.status != from {
                return Err(EngineError::TransitionRefused {
                    order_id,
                    from,
                    to: change.status(),
                });
            }
            match change {
                StatusChange::Routing => entry.status = OrderStatus::Routing,
                StatusChange::Building { dex } => {
                    entry.status = OrderStatus::Building;
                    entry.dex_type = Some(dex);
                }
                StatusChange::Submitted { tx_hash } => {
                    entry.status = OrderStatus::Submitted;
                    entry.tx_hash = Some(tx_hash);
                }
                StatusChange::Confirmed { executed_price } => {
                    entry.status = OrderStatus::Confirmed;
                    entry.executed_price = Some(executed_price);
                }
                StatusChange::Failed { reason } => {
                    entry.status = OrderStatus::Failed;
                    entry.error_reason = Some(reason);
                }
            }
            entry.updated_at = Utc::now();
            Ok(entry.clone())
        }

        async fn mark_failed(&self, order_id: Uuid, reason: &str) -> Result<Order> {
            self.maybe_fail()?;
            let mut entry = self
                .orders
                .get_mut(&order_id)
                .ok_or(EngineError::OrderNotFound(order_id))?;
            if entry.status.is_terminal() {
                return Err(EngineError::TransitionRefused {
                    order_id,
                    from: entry.status,
                    to: OrderStatus::Failed,
                });
            }
            entry.status = OrderStatus::Failed;
            entry.error_reason = Some(reason.to_string());
            entry.updated_at = Utc::now();
            Ok(entry.clone())
        }
    }

    struct StubRouter {
        quote: Quote,
        fail_quote: bool,
        fail_build: bool,
    }

    impl StubRouter {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                quote: Quote {
                    dex: DexType::Raydium,
                    quote_price: dec!(151),
                    effective_price: dec!(150),
                    fee_bps: 25,
                    quote_latency_ms: 5,
                },
                fail_quote: false,
                fail_build: false,
            })
        }

        fn failing_quote() -> Arc<Self> {
            Arc::new(Self {
                quote: Self::ok().quote.clone(),
                fail_quote: true,
                fail_build: false,
            })
        }

        fn failing_build() -> Arc<Self> {
            Arc::new(Self {
                quote: Self::ok().quote.clone(),
                fail_quote: false,
                fail_build: true,
            })
        }
    }

    #[async_trait]
    impl Router for StubRouter {
        async fn best_quote(&self, _order: &Order) -> Result<Quote> {
            if self.fail_quote {
                return Err(EngineError::Router("no liquidity".to_string()));
            }
            Ok(self.quote.clone())
        }

        async fn build_tx(&self, _order: &Order, quote: &Quote) -> Result<BuiltTx> {
            if self.fail_build {
                return Err(EngineError::Router("serialization refused".to_string()));
            }
            Ok(BuiltTx {
                dex: quote.dex,
                blob: "ff".repeat(96),
            })
        }
    }

    enum ConfirmBehavior {
        Confirm,
        Timeout,
        Error,
    }

    struct StubChain {
        fail_submit: bool,
        confirm: ConfirmBehavior,
    }

    impl StubChain {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail_submit: false,
                confirm: ConfirmBehavior::Confirm,
            })
        }
    }

    #[async_trait]
    impl Chain for StubChain {
        async fn submit(&self, _tx: &BuiltTx) -> Result<String> {
            if self.fail_submit {
                return Err(EngineError::Chain("node rejected".to_string()));
            }
            Ok("ab".repeat(32))
        }

        async fn await_confirmation(&self, _tx_hash: &str, _timeout: Duration) -> Result<()> {
            match self.confirm {
                ConfirmBehavior::Confirm => Ok(()),
                ConfirmBehavior::Timeout => Err(EngineError::ConfirmationTimeout),
                ConfirmBehavior::Error => Err(EngineError::Chain("reverted".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<StatusEvent>>,
    }

    impl RecordingSink {
        fn statuses(&self) -> Vec<OrderStatus> {
            self.events.lock().iter().map(|e| e.status).collect()
        }
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn publish(&self, event: StatusEvent) {
            self.events.lock().push(event);
        }
    }

    fn lifecycle(
        store: Arc<MemStore>,
        router: Arc<StubRouter>,
        chain: Arc<StubChain>,
        sink: Arc<RecordingSink>,
    ) -> OrderLifecycle {
        OrderLifecycle::new(store, router, chain, sink, Duration::from_secs(60))
    }

    async fn seeded_order(store: &Arc<MemStore>) -> Uuid {
        let order = Order::new("SOL".into(), "USDC".into(), dec!(1.5), 0.5, None);
        let id = order.order_id;
        store.create(&order).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_happy_path_transitions_in_order() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(store.clone(), StubRouter::ok(), StubChain::ok(), sink.clone());
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap();

        assert_eq!(
            sink.statuses(),
            vec![
                OrderStatus::Routing,
                OrderStatus::Building,
                OrderStatus::Submitted,
                OrderStatus::Confirmed,
            ]
        );

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.dex_type, Some(DexType::Raydium));
        assert!(order.tx_hash.is_some());
        let price = order.executed_price.unwrap();
        assert_eq!(price.scale(), 8);
        assert!(order.error_reason.is_none());
        assert!(order.updated_at >= order.created_at);
    }

    #[tokio::test]
    async fn test_routing_failure_lands_in_failed() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(
            store.clone(),
            StubRouter::failing_quote(),
            StubChain::ok(),
            sink.clone(),
        );
        let id = seeded_order(&store).await;

        let err = lc.execute(id).await.unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));

        assert_eq!(sink.statuses(), vec![OrderStatus::Failed]);
        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert!(order
            .error_reason
            .as_deref()
            .unwrap()
            .starts_with("DEX routing failed"));
    }

    #[tokio::test]
    async fn test_build_failure_reason_prefix() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(
            store.clone(),
            StubRouter::failing_build(),
            StubChain::ok(),
            sink.clone(),
        );
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap_err();

        assert_eq!(sink.statuses(), vec![OrderStatus::Routing, OrderStatus::Failed]);
        let order = store.get(id).await.unwrap().unwrap();
        assert!(order
            .error_reason
            .as_deref()
            .unwrap()
            .starts_with("Transaction building failed"));
    }

    #[tokio::test]
    async fn test_submission_failure_reason_prefix() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let chain = Arc::new(StubChain {
            fail_submit: true,
            confirm: ConfirmBehavior::Confirm,
        });
        let lc = lifecycle(store.clone(), StubRouter::ok(), chain, sink.clone());
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap_err();

        let order = store.get(id).await.unwrap().unwrap();
        assert!(order
            .error_reason
            .as_deref()
            .unwrap()
            .starts_with("Transaction submission failed"));
        assert!(order.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_confirmation_timeout_reason_is_exact() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let chain = Arc::new(StubChain {
            fail_submit: false,
            confirm: ConfirmBehavior::Timeout,
        });
        let lc = lifecycle(store.clone(), StubRouter::ok(), chain, sink.clone());
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap_err();

        assert_eq!(
            sink.statuses(),
            vec![
                OrderStatus::Routing,
                OrderStatus::Building,
                OrderStatus::Submitted,
                OrderStatus::Failed,
            ]
        );
        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(
            order.error_reason.as_deref(),
            Some("Transaction confirmation timeout")
        );
        // The hash set at submission survives the failure.
        assert!(order.tx_hash.is_some());
    }

    #[tokio::test]
    async fn test_confirmation_error_reason_prefix() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let chain = Arc::new(StubChain {
            fail_submit: false,
            confirm: ConfirmBehavior::Error,
        });
        let lc = lifecycle(store.clone(), StubRouter::ok(), chain, sink.clone());
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap_err();

        let order = store.get(id).await.unwrap().unwrap();
        assert!(order
            .error_reason
            .as_deref()
            .unwrap()
            .starts_with("Transaction failed"));
    }

    #[tokio::test]
    async fn test_duplicate_execution_is_a_noop() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(store.clone(), StubRouter::ok(), StubChain::ok(), sink.clone());
        let id = seeded_order(&store).await;

        lc.execute(id).await.unwrap();
        let events_after_first = sink.events.lock().len();

        lc.execute(id).await.unwrap();
        assert_eq!(sink.events.lock().len(), events_after_first);
    }

    #[tokio::test]
    async fn test_failed_store_write_is_retried_once() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(
            store.clone(),
            StubRouter::failing_quote(),
            StubChain::ok(),
            sink.clone(),
        );
        let id = seeded_order(&store).await;

        store.fail_next_writes(1);
        lc.execute(id).await.unwrap_err();

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(sink.statuses(), vec![OrderStatus::Failed]);
    }

    #[tokio::test]
    async fn test_unknown_order_errors() {
        let store = MemStore::new();
        let sink = Arc::new(RecordingSink::default());
        let lc = lifecycle(store, StubRouter::ok(), StubChain::ok(), sink);

        let err = lc.execute(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::OrderNotFound(_)));
    }

    fn quote(quote_price: Decimal, effective_price: Decimal) -> Quote {
        Quote {
            dex: DexType::Meteora,
            quote_price,
            effective_price,
            fee_bps: 20,
            quote_latency_ms: 1,
        }
    }

    #[test]
    fn test_price_clamped_when_slippage_exceeds_tolerance() {
        // Observed slippage ~0.667% against a 0.5% tolerance.
        let q = quote(dec!(151), dec!(150));
        let price = compute_executed_price(&q, 0.5);
        assert_eq!(price, dec!(149.25000000));
    }

    #[test]
    fn test_zero_tolerance_with_observed_slippage_pays_effective() {
        let q = quote(dec!(151), dec!(150));
        let price = compute_executed_price(&q, 0.0);
        assert_eq!(price, dec!(150.00000000));
        assert_eq!(price.scale(), 8);
    }

    #[test]
    fn test_zero_observed_slippage_applies_microvariance() {
        let q = quote(dec!(150), dec!(150));
        let price = compute_executed_price(&q, 0.0);
        assert!(price <= dec!(150));
        assert!(price > dec!(150) * (Decimal::ONE - dec!(0.001)));
    }

    #[test]
    fn test_within_tolerance_applies_microvariance() {
        // Observed ~0.667% under a 5% tolerance.
        let q = quote(dec!(151), dec!(150));
        let price = compute_executed_price(&q, 5.0);
        assert!(price <= dec!(150));
        assert!(price > dec!(150) * (Decimal::ONE - dec!(0.001)));
        assert_eq!(price.scale(), 8);
    }
}
