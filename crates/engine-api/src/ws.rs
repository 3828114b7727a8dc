use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use engine_core::types::{StatusEvent, WireFrame};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages a subscriber may send upstream.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Ping,
}

/// GET /api/orders/:order_id/stream
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream(socket, state, order_id))
}

async fn handle_stream(socket: WebSocket, state: AppState, order_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (subscriber_id, mut frames) = state.registry.register(order_id);

    info!(order_id = %order_id, subscriber = subscriber_id, "Stream opened");

    // Confirmation frame straight to the channel so it precedes any event.
    state
        .registry
        .send_to(subscriber_id, &WireFrame::connected(order_id));

    // Deferred snapshot of the persisted row; a subscriber that attaches
    // for an unknown order simply gets no snapshot.
    let snapshot_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(snapshot_state.snapshot_delay).await;
        match snapshot_state.store.get(order_id).await {
            Ok(Some(order)) => {
                snapshot_state.registry.send_to(
                    subscriber_id,
                    &WireFrame::update(StatusEvent::from_order(&order)),
                );
            }
            Ok(None) => {
                debug!(order_id = %order_id, "No row yet for stream snapshot");
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Snapshot read failed");
            }
        }
    });

    // Forward registry frames to the wire; a write failure unregisters
    // this subscriber and leaves the rest untouched.
    let registry = state.registry.clone();
    let send_task = tokio::spawn(async move {
        while let Some(json) = frames.recv().await {
            if sender.send(Message::Text(json)).await.is_err() {
                registry.unregister(subscriber_id);
                return;
            }
        }
        // Channel closed by resource teardown: drain is done, close the
        // socket.
        let _ = sender.send(Message::Close(None)).await;
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                if let Ok(ClientMessage::Ping) = serde_json::from_str(&text) {
                    state.registry.send_to(subscriber_id, &WireFrame::pong());
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {
                // Protocol-level ping/pong is handled by the framework.
            }
            _ => {}
        }
    }

    state.registry.unregister(subscriber_id);
    send_task.abort();
    info!(order_id = %order_id, subscriber = subscriber_id, "Stream closed");
}
