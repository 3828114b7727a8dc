use crate::handlers;
use crate::state::AppState;
use crate::ws::stream_handler;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState, cors_enabled: bool) -> Router {
    let cors = if cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/orders/execute", post(handlers::create_order))
        .route("/api/orders", get(handlers::list_orders))
        .route("/api/orders/:order_id", get(handlers::get_order))
        .route("/api/orders/:order_id/stream", get(stream_handler))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
