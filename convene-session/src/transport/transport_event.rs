use crate::media::RemoteTrack;
use convene_core::IceCandidate;

/// Connection state as reported by the underlying peer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Coarse link quality. Variants are ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Lost,
}

/// Events a transport reports to the peer link that owns it.
#[derive(Debug)]
pub enum TransportEvent {
    StateChanged(TransportState),

    /// A local ICE candidate was gathered and has to reach the remote side.
    CandidateGenerated(IceCandidate),

    RemoteTrack(RemoteTrack),

    Quality(ConnectionQuality),
}
