use crate::model::DbOrder;
use crate::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Order CRUD plus compare-and-set status transitions. Every transition
/// query carries the expected predecessor in its WHERE clause, so a stale
/// writer updates zero rows instead of rewinding the lifecycle.
pub struct OrderRepository;

impl OrderRepository {
    pub async fn insert(pool: &PgPool, order: &DbOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, token_in, token_out, amount_in, slippage_tolerance,
                                min_amount_out, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.order_id)
        .bind(&order.token_in)
        .bind(&order.token_out)
        .bind(order.amount_in)
        .bind(order.slippage_tolerance)
        .bind(order.min_amount_out)
        .bind(&order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get(pool: &PgPool, order_id: Uuid) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Newest-first page
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<DbOrder>> {
        let rows = sqlx::query_as::<_, DbOrder>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_routing(
        pool: &PgPool,
        order_id: Uuid,
        from: &str,
    ) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            UPDATE orders SET status = 'routing', updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_building(
        pool: &PgPool,
        order_id: Uuid,
        from: &str,
        dex_type: &str,
    ) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            UPDATE orders SET status = 'building', dex_type = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(dex_type)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Sets the transaction hash exactly once.
    pub async fn mark_submitted(
        pool: &PgPool,
        order_id: Uuid,
        from: &str,
        tx_hash: &str,
    ) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            UPDATE orders SET status = 'submitted', tx_hash = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2 AND tx_hash IS NULL
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(tx_hash)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_confirmed(
        pool: &PgPool,
        order_id: Uuid,
        from: &str,
        executed_price: Decimal,
    ) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            UPDATE orders SET status = 'confirmed', executed_price = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(executed_price)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Failure is reachable from any non-terminal state.
    pub async fn mark_failed(
        pool: &PgPool,
        order_id: Uuid,
        reason: &str,
    ) -> Result<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            UPDATE orders SET status = 'failed', error_reason = $2, updated_at = NOW()
            WHERE order_id = $1 AND status NOT IN ('confirmed', 'failed')
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(reason)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
}
