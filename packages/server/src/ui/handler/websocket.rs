//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, Outbound, RoomKey},
    runtime::RoomHandle,
    ui::state::AppState,
    usecase::RoomEvent,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> RoomKey (Domain Model)
    let room = match RoomKey::new(room_id) {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket upgrade: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room)))
}

/// Spawns a task that forwards frames queued by the room to the WebSocket sender.
///
/// `Outbound::Close` closes the socket and ends the task.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: RoomKey) {
    let (sender, mut receiver) = socket.split();
    let connection_id = ConnectionId::generate();

    // Create a channel for the room to push frames to this socket
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = match state.registry.open(&room, connection_id, tx).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!("Connection to room '{}' refused: {}", room, e);
            return;
        }
    };
    tracing::info!("Connection '{}' joined room '{}'", connection_id, room);

    let mut send_task = pusher_loop(rx, sender);

    let recv_handle = handle.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    recv_handle.send(RoomEvent::Error {
                        connection_id,
                        reason: e.to_string(),
                    });
                    return;
                }
            };

            let delivered = match msg {
                Message::Text(text) => recv_handle.send(RoomEvent::Message {
                    connection_id,
                    text: text.to_string(),
                }),
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                // Binary frames and control frames only count as liveness
                _ => recv_handle.send(RoomEvent::Activity { connection_id }),
            };
            if !delivered {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    close(&handle, connection_id, &room);
}

fn close(handle: &RoomHandle, connection_id: ConnectionId, room: &RoomKey) {
    // Idempotent in the room; a stopped room has already dropped the socket
    handle.send(RoomEvent::Close { connection_id });
    tracing::info!("Connection '{}' left room '{}'", connection_id, room);
}
