use crate::hub::RelayHub;
use async_trait::async_trait;
use convene_core::{Participant, RelayConnection, RelayError, RoomId, SignalingTransport, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// In-process signaling transport backed by a [`RelayHub`].
///
/// Besides embedding, it lets tests take the relay offline and cut live connections.
#[derive(Clone)]
pub struct MemoryTransport {
    hub: RelayHub,
    online: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new(hub: RelayHub) -> Self {
        Self {
            hub,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// While offline every `connect` fails with `RelayError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Drops the live connection of `user_id`, as a network failure would.
    pub fn disconnect(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.hub.disconnect(room_id, user_id)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(RelayHub::default())
    }
}

#[async_trait]
impl SignalingTransport for MemoryTransport {
    async fn connect(
        &self,
        room_id: &RoomId,
        participant: &Participant,
    ) -> Result<RelayConnection, RelayError> {
        if !self.is_online() {
            return Err(RelayError::Unavailable("memory relay is offline".into()));
        }

        debug!("Memory connection for {} in room {}", participant.user_id, room_id);
        let (connection, relay_rx, relay_tx) = RelayConnection::pair();
        let hub = self.hub.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            hub.serve(room_id, relay_rx, relay_tx).await;
        });

        Ok(connection)
    }
}
