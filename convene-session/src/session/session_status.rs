use crate::peer::PeerLinkStatus;
use crate::transport::ConnectionQuality;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingStatus {
    Connected,
    Reconnecting,
    Lost,
    Closed,
}

/// Session-level view aggregated over all peer links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub signaling: SignalingStatus,
    pub peer_count: usize,
    pub connected_peers: usize,
    /// Worst quality over all links; `None` without links.
    pub quality: Option<ConnectionQuality>,
}

impl SessionStatus {
    pub fn aggregate<'a>(
        signaling: SignalingStatus,
        links: impl IntoIterator<Item = &'a PeerLinkStatus>,
    ) -> Self {
        let mut status = Self {
            signaling,
            peer_count: 0,
            connected_peers: 0,
            quality: None,
        };

        for link in links {
            status.peer_count += 1;
            if link.state.is_connected() {
                status.connected_peers += 1;
            }
            let quality = link.effective_quality();
            status.quality = Some(status.quality.map_or(quality, |worst| worst.max(quality)));
        }

        status
    }
}
