use crate::dto::{
    CreateOrderResponse, ErrorResponse, ExecuteOrderRequest, GetOrderResponse, HealthResponse,
    ListOrdersQuery, ListOrdersResponse,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use engine_core::types::Order;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ErrorResponse>)>;

fn internal(error: &str, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal(error, message)),
    )
}

/// POST /api/orders/execute
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<ExecuteOrderRequest>,
) -> ApiResult<(StatusCode, Json<CreateOrderResponse>)> {
    let valid = req.validate().map_err(|details| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation(details)),
        )
    })?;

    let order = Order::new(
        valid.token_in,
        valid.token_out,
        valid.amount_in,
        valid.slippage_tolerance,
        valid.min_amount_out,
    );
    let order_id = order.order_id;

    state.store.create(&order).await.map_err(|e| {
        error!(order_id = %order_id, error = %e, "Failed to persist order");
        internal("Order creation failed", e.to_string())
    })?;

    state.resources.allocate(order_id).await.map_err(|e| {
        error!(order_id = %order_id, error = %e, "Failed to allocate order resources");
        internal("Order execution setup failed", e.to_string())
    })?;

    let enqueued = state.resources.enqueue_execution(order_id).await.map_err(|e| {
        error!(order_id = %order_id, error = %e, "Failed to enqueue execution");
        internal("Order execution setup failed", e.to_string())
    })?;

    info!(
        order_id = %order_id,
        token_in = %order.token_in,
        token_out = %order.token_out,
        enqueued = enqueued,
        "Order accepted"
    );
    engine_metrics::counters::orders_created(1);

    // The write should already be visible; poke a few times before falling
    // back to the bare id.
    let mut persisted = None;
    for delay_ms in [200u64, 500, 1000] {
        match state.store.get(order_id).await {
            Ok(Some(row)) => {
                persisted = Some(row);
                break;
            }
            Ok(None) => tokio::time::sleep(Duration::from_millis(delay_ms)).await,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Readback failed after create");
                break;
            }
        }
    }

    let message = if persisted.is_some() {
        "Order accepted for execution"
    } else {
        "Order accepted; fetch it again shortly"
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            order_id,
            status: "pending",
            order: persisted,
            message,
        }),
    ))
}

/// GET /api/orders/:order_id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<GetOrderResponse>> {
    let order = state
        .store
        .get(order_id)
        .await
        .map_err(|e| internal("Order lookup failed", e.to_string()))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::not_found(format!("Order {order_id} not found"))),
            )
        })?;

    Ok(Json(GetOrderResponse {
        success: true,
        order,
    }))
}

/// GET /api/orders?limit=&offset=
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<ListOrdersResponse>> {
    let limit = query.limit.clamp(1, 1000);
    let offset = query.offset.max(0);

    let orders = state
        .store
        .list(limit, offset)
        .await
        .map_err(|e| internal("Order listing failed", e.to_string()))?;

    let count = orders.len();
    Ok(Json(ListOrdersResponse {
        success: true,
        orders,
        count,
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
