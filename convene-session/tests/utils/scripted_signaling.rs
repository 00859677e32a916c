use async_trait::async_trait;
use convene_core::{Envelope, Participant, RelayConnection, RelayError, RoomId, SignalingTransport};
use tokio::sync::mpsc;

/// Relay end of one scripted connection, driven directly by a test.
pub struct ScriptedConnection {
    pub from_client: mpsc::UnboundedReceiver<Envelope>,
    pub to_client: mpsc::UnboundedSender<Envelope>,
}

/// Signaling transport whose relay side is the test itself.
pub struct ScriptedSignaling {
    connections: mpsc::UnboundedSender<ScriptedConnection>,
}

impl ScriptedSignaling {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScriptedConnection>) {
        let (connections, rx) = mpsc::unbounded_channel();
        (Self { connections }, rx)
    }
}

#[async_trait]
impl SignalingTransport for ScriptedSignaling {
    async fn connect(
        &self,
        _room_id: &RoomId,
        _participant: &Participant,
    ) -> Result<RelayConnection, RelayError> {
        let (connection, from_client, to_client) = RelayConnection::pair();
        self.connections
            .send(ScriptedConnection {
                from_client,
                to_client,
            })
            .map_err(|_| RelayError::Closed)?;
        Ok(connection)
    }
}
