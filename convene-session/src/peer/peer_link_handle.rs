use crate::peer::{ConnectionState, LinkCommand, LinkSetup, PeerLink};
use crate::transport::ConnectionQuality;
use convene_core::{MediaState, NegotiationRole, Participant, UserId};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

/// Snapshot of one link, published by the link task.
#[derive(Debug, Clone)]
pub struct PeerLinkStatus {
    pub participant: Participant,
    pub role: NegotiationRole,
    pub state: ConnectionState,
    pub last_activity: Instant,
    pub last_remote_media: Option<MediaState>,
    /// Id of the track behind the outgoing video sender.
    pub outgoing_video: Option<String>,
    pub quality: Option<ConnectionQuality>,
    pub restart_attempts: u32,
}

impl PeerLinkStatus {
    pub fn new(participant: Participant, role: NegotiationRole) -> Self {
        Self {
            participant,
            role,
            state: ConnectionState::Idle,
            last_activity: Instant::now(),
            last_remote_media: None,
            outgoing_video: None,
            quality: None,
            restart_attempts: 0,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.participant.user_id
    }

    /// Quality used for session aggregation: anything not connected counts as lost.
    pub fn effective_quality(&self) -> ConnectionQuality {
        if self.state.is_connected() {
            self.quality.unwrap_or(ConnectionQuality::Good)
        } else {
            ConnectionQuality::Lost
        }
    }
}

/// Owner side of a running [`PeerLink`] task.
pub struct PeerLinkHandle {
    participant: Participant,
    generation: u64,
    commands: mpsc::UnboundedSender<LinkCommand>,
    status: watch::Receiver<PeerLinkStatus>,
    task: JoinHandle<()>,
}

impl PeerLinkHandle {
    pub fn spawn(setup: LinkSetup) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) =
            watch::channel(PeerLinkStatus::new(setup.remote.clone(), setup.role));

        let participant = setup.remote.clone();
        let generation = setup.generation;
        let task = tokio::spawn(PeerLink::launch(setup, command_rx, status_tx));

        Self {
            participant,
            generation,
            commands,
            status,
            task,
        }
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn user_id(&self) -> &UserId {
        &self.participant.user_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> PeerLinkStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PeerLinkStatus> {
        self.status.clone()
    }

    /// Returns false once the link task has stopped.
    pub fn send(&self, cmd: LinkCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    /// Asks the link to close and waits for it, aborting the task after `timeout`.
    pub async fn close(mut self, timeout: Duration) {
        let _ = self.commands.send(LinkCommand::Close);

        if tokio::time::timeout(timeout, &mut self.task).await.is_err() {
            warn!(
                "Link to {} did not close within {:?}, aborting",
                self.participant.user_id, timeout
            );
            self.task.abort();
        }
    }
}
