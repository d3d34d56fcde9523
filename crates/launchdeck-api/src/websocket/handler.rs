//! WebSocket handler implementation.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::state::AppState;

use super::hub::BroadcastHub;
use super::message::WsMessage;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Register the socket with the hub and pump its queue until either side closes.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let subscription = hub.subscribe();
    let connection_id = subscription.id.clone();
    let mut rx = subscription.receiver;
    info!("WebSocket connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    let connected = WsMessage::Connected {
        connection_id: connection_id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            hub.unsubscribe(&connection_id);
            return;
        }
    }

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsMessage>(text.as_str()) {
                Ok(WsMessage::Ping { timestamp }) => {
                    hub.send_to(&connection_id, &WsMessage::Pong { timestamp });
                }
                Ok(_) => {}
                Err(_) => debug!("Ignoring client frame from {}: {}", connection_id, text.as_str()),
            },
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: {}", connection_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    hub.unsubscribe(&connection_id);
    sender_task.abort();
    info!("WebSocket disconnected: {}", connection_id);
}
