//! WebSocket push channel for job snapshots.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use deckhand::{JobProgressBroadcaster, JobUpdate};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn job_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| forward_updates(socket, broadcaster))
}

fn encode(update: &JobUpdate) -> Option<Message> {
    match serde_json::to_string(update) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!("Failed to encode job update: {}", e);
            None
        }
    }
}

/// Forwards every update to the socket until either side goes away.
async fn forward_updates(socket: WebSocket, broadcaster: JobProgressBroadcaster) {
    let mut updates = broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!(subscribers = broadcaster.subscriber_count(), "WebSocket client connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    let Some(message) = encode(&update) else { continue };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, missed {} job updates", n);
                }
                Err(RecvError::Closed) => {
                    info!("Job broadcaster closed, closing WebSocket");
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) if text.as_str() == "ping" => {
                    if sender.send(Message::Text("pong".into())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }

    info!("WebSocket client disconnected");
}
