use crate::model::DbOrder;
use crate::pool::DatabasePool;
use crate::repository::OrderRepository;
use async_trait::async_trait;
use engine_core::types::{Order, OrderStatus, StatusChange};
use engine_core::{EngineError, OrderStore};
use uuid::Uuid;

/// Postgres-backed [`OrderStore`].
pub struct PgOrderStore {
    pool: DatabasePool,
}

impl PgOrderStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Distinguish a refused CAS from a missing row; a refused transition
    /// reports the row's actual status.
    async fn refused_or_missing(&self, order_id: Uuid, to: OrderStatus) -> EngineError {
        match OrderRepository::get(self.pool.inner(), order_id).await {
            Ok(Some(row)) => {
                let from = OrderStatus::parse(&row.status).unwrap_or(to);
                EngineError::TransitionRefused { order_id, from, to }
            }
            Ok(None) => EngineError::OrderNotFound(order_id),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &Order) -> engine_core::Result<()> {
        let row = DbOrder::from_order(order);
        OrderRepository::insert(self.pool.inner(), &row)
            .await
            .map_err(EngineError::from)
    }

    async fn get(&self, order_id: Uuid) -> engine_core::Result<Option<Order>> {
        let row = OrderRepository::get(self.pool.inner(), order_id)
            .await
            .map_err(EngineError::from)?;
        row.map(|r| r.into_order().map_err(EngineError::from))
            .transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> engine_core::Result<Vec<Order>> {
        let rows = OrderRepository::list(self.pool.inner(), limit, offset)
            .await
            .map_err(EngineError::from)?;
        rows.into_iter()
            .map(|r| r.into_order().map_err(EngineError::from))
            .collect()
    }

    async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> engine_core::Result<Order> {
        let pool = self.pool.inner();
        let to = change.status();
        let from_str = from.as_str();

        let row = match change {
            StatusChange::Routing => OrderRepository::mark_routing(pool, order_id, from_str).await,
            StatusChange::Building { dex } => {
                OrderRepository::mark_building(pool, order_id, from_str, dex.as_str()).await
            }
            StatusChange::Submitted { ref tx_hash } => {
                OrderRepository::mark_submitted(pool, order_id, from_str, tx_hash).await
            }
            StatusChange::Confirmed { executed_price } => {
                OrderRepository::mark_confirmed(pool, order_id, from_str, executed_price).await
            }
            StatusChange::Failed { ref reason } => {
                OrderRepository::mark_failed(pool, order_id, reason).await
            }
        }
        .map_err(EngineError::from)?;

        match row {
            Some(row) => row.into_order().map_err(EngineError::from),
            None => Err(self.refused_or_missing(order_id, to).await),
        }
    }

    async fn mark_failed(&self, order_id: Uuid, reason: &str) -> engine_core::Result<Order> {
        let row = OrderRepository::mark_failed(self.pool.inner(), order_id, reason)
            .await
            .map_err(EngineError::from)?;

        match row {
            Some(row) => row.into_order().map_err(EngineError::from),
            None => Err(self.refused_or_missing(order_id, OrderStatus::Failed).await),
        }
    }
}
