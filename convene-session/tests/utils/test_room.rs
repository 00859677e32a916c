use crate::utils::MockTransportFactory;
use convene_core::{BackoffPolicy, Participant, RoomId, UserId};
use convene_relay::{MemoryTransport, RelayConfig, RelayHub};
use convene_session::{SampleTrackDevices, SessionConfig, SessionCoordinator, SessionHandle};
use std::sync::Arc;
use std::time::Duration;

/// Session settings with short timers so failure paths finish quickly.
pub fn test_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.ice_servers = Vec::new();
    config.signaling.reconnect =
        BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(4), 6);
    config.peer.negotiation_timeout = Duration::from_secs(2);
    config.peer.restart = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 2);
    config.peer.close_timeout = Duration::from_millis(500);
    config
}

pub struct TestPeer {
    pub user_id: UserId,
    pub session: SessionHandle,
    pub devices: Arc<SampleTrackDevices>,
}

/// One in-process relay plus a shared mock transport factory.
pub struct TestRoom {
    pub room_id: RoomId,
    pub relay: MemoryTransport,
    pub factory: MockTransportFactory,
    pub config: SessionConfig,
}

impl TestRoom {
    pub fn new(room: &str) -> Self {
        Self::with_config(room, test_config())
    }

    pub fn with_config(room: &str, config: SessionConfig) -> Self {
        let hub = RelayHub::new(RelayConfig::default());
        Self {
            room_id: RoomId::from(room),
            relay: MemoryTransport::new(hub),
            factory: MockTransportFactory::new(),
            config,
        }
    }

    pub fn coordinator(&self, devices: Arc<SampleTrackDevices>) -> SessionCoordinator {
        SessionCoordinator::new(
            self.config.clone(),
            Arc::new(self.relay.clone()),
            Arc::new(self.factory.clone()),
            devices,
        )
    }

    pub async fn join(&self, user: &str) -> TestPeer {
        self.join_with(user, Arc::new(SampleTrackDevices::new()))
            .await
    }

    pub async fn join_with(&self, user: &str, devices: Arc<SampleTrackDevices>) -> TestPeer {
        let session = self
            .coordinator(devices.clone())
            .join_session(self.room_id.clone(), Participant::new(user, user.to_uppercase()))
            .await
            .expect("Failed to join session");

        TestPeer {
            user_id: UserId::from(user),
            session,
            devices,
        }
    }
}
