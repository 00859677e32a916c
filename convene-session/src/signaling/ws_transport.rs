use async_trait::async_trait;
use convene_core::{Envelope, Participant, RelayConnection, RelayError, RoomId, SignalingTransport};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// [`SignalingTransport`] speaking JSON envelopes over a WebSocket to a relay.
///
/// `base_url` is the relay root, e.g. `ws://localhost:8080`; rooms live at `/rooms/{room_id}/ws`.
#[derive(Debug, Clone)]
pub struct WsSignalingTransport {
    base_url: String,
}

impl WsSignalingTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn room_url(&self, room_id: &RoomId) -> String {
        format!(
            "{}/rooms/{}/ws",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(room_id.as_str())
        )
    }
}

#[async_trait]
impl SignalingTransport for WsSignalingTransport {
    async fn connect(
        &self,
        room_id: &RoomId,
        participant: &Participant,
    ) -> Result<RelayConnection, RelayError> {
        let url = self.room_url(room_id);
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Unavailable(e.to_string()))?;
        debug!("WebSocket to {} open for {}", url, participant.user_id);

        let (mut sink, mut stream) = socket.split();
        let (connection, mut relay_rx, relay_tx) = RelayConnection::pair();

        tokio::spawn(async move {
            while let Some(envelope) = relay_rx.recv().await {
                match serde_json::to_string(&envelope) {
                    Ok(json) => {
                        if sink.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize envelope: {}", e),
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => {
                            if relay_tx.send(envelope).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid envelope from relay: {:?}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        Ok(connection)
    }
}
