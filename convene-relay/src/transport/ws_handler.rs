use crate::hub::RelayHub;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use convene_core::{Envelope, RoomId};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Routes of the relay: one WebSocket endpoint per room.
pub fn router(hub: RelayHub) -> Router {
    Router::new()
        .route("/rooms/{room_id}/ws", get(ws_handler))
        .with_state(hub)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(hub): State<RelayHub>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, hub))
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, hub: RelayHub) {
    info!("New WebSocket connection for room {}", room_id);

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Envelope>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Envelope>();

    let send_task = tokio::spawn(async move {
        while let Some(envelope) = out_rx.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize envelope: {}", e),
            }
        }
    });

    let recv_task = tokio::spawn({
        let room_id = room_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => {
                            if in_tx.send(envelope).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid envelope in room {}: {:?}", room_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    hub.serve(room_id.clone(), in_rx, out_tx).await;

    recv_task.abort();
    let _ = send_task.await;
    info!("WebSocket disconnected from room {}", room_id);
}
