//! WebSocket connection handler
//!
//! Every connection becomes a fleet observer: it receives the current
//! snapshot on connect and a fresh one after every status change.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use supervisor::SnapshotSender;

use crate::state::AppState;

/// Snapshots queued per connection before delivery starts to wait
const OBSERVER_QUEUE_DEPTH: usize = 16;

/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (observer, mut snapshots) = SnapshotSender::new(OBSERVER_QUEUE_DEPTH);
    let observer_id = state.fleet.connect_observer(Arc::new(observer)).await;
    let connections = state.increment_connection_count();
    info!(observer = %observer_id, connections, "🔗 WebSocket connected");

    let mut outgoing_task = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            let json = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(e) => {
                    warn!(observer = %observer_id, error = %e, "Failed to serialize snapshot");
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json)).await {
                debug!(observer = %observer_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut incoming_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(text)) => debug!(observer = %observer_id, "Ignoring client message: {}", text),
                Ok(_) => {}
                Err(e) => {
                    debug!(observer = %observer_id, error = %e, "WebSocket receive failed");
                    break;
                }
            }
        }
    });

    // Whichever side ends first takes the other down
    tokio::select! {
        _ = &mut outgoing_task => incoming_task.abort(),
        _ = &mut incoming_task => outgoing_task.abort(),
    }

    state.fleet.disconnect_observer(observer_id).await;
    let connections = state.decrement_connection_count();
    info!(observer = %observer_id, connections, "🔌 WebSocket disconnected");
}
