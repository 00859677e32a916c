use crate::media::RemoteTrack;
use crate::peer::ConnectionState;
use crate::transport::ConnectionQuality;
use convene_core::UserId;

/// Report from a link task to the coordinator.
///
/// `generation` identifies the link incarnation; events of a replaced link are stale.
#[derive(Debug)]
pub struct LinkEvent {
    pub user_id: UserId,
    pub generation: u64,
    pub kind: LinkEventKind,
}

#[derive(Debug)]
pub enum LinkEventKind {
    StateChanged(ConnectionState),
    RemoteTrack(RemoteTrack),
    Quality(ConnectionQuality),
    NegotiationTimeout,
    /// Restarts are exhausted and the link is closed.
    Unreachable,
}
