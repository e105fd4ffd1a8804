//! Real-time channel over WebSocket
//!
//! On connect the observer gets a `state` event, then every `start`,
//! `tick`, `reset` and `done` in the order the server produced them.
//! Observers may send `start`/`reset` commands on the same socket.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    broadcast::{ClientCommand, ServerEvent, Subscription},
    state::{AppState, StateSnapshot},
};

/// Handle GET /ws - Upgrade to the real-time channel
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one observer until it disconnects or stops accepting messages
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (mut subscription, snapshot) = state.connect();
    info!("Observer connected ({} total)", state.hub.observers());

    if send_event(&mut socket, &ServerEvent::State(snapshot)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = next_event(&mut subscription, &state) => {
                let Some(event) = event else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break; // Client disconnected
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        apply_command(&state, &text);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {} // Ignore binary and ping/pong frames
                }
            }
        }
    }

    drop(subscription);
    info!("Observer disconnected ({} remaining)", state.hub.observers());
}

/// Next event for one observer. After a lag the stale backlog is dropped
/// and the observer catches up with a single `state` event.
async fn next_event(subscription: &mut Subscription, state: &AppState) -> Option<ServerEvent> {
    match subscription.recv().await {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(skipped)) => {
            warn!("Observer lagged by {} events, resending state", skipped);
            Some(ServerEvent::State(state.resync(subscription)))
        }
        Err(RecvError::Closed) => None,
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode {} event: {}", event.name(), e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}

/// Run an observer command; invalid frames are ignored.
///
/// The resulting broadcast reaches every observer, the sender included.
pub fn apply_command(state: &Arc<AppState>, text: &str) -> Option<StateSnapshot> {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            debug!("Ignoring observer message {:?}: {}", text, e);
            return None;
        }
    };

    let snapshot = match command {
        ClientCommand::Start(request) => state.start(request.resolve()),
        ClientCommand::Reset(request) => state.reset(request.resolve()),
    };
    Some(snapshot)
}
