use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::models::assignment::Assignment;
use crate::state::AppState;

/// Frame pushed to dashboard clients.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DispatchEvent<'a> {
    CourierAssigned(&'a Assignment),
    Lagged { skipped: u64 },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.assignment_events_tx.subscribe();

    info!("dispatch feed client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let json = match rx.recv().await {
                Ok(assignment) => serde_json::to_string(&DispatchEvent::CourierAssigned(&assignment)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dispatch feed client lagging");
                    serde_json::to_string(&DispatchEvent::Lagged { skipped })
                }
                Err(RecvError::Closed) => break,
            };

            let json = match json {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize dispatch event");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("dispatch feed client disconnected");
}
