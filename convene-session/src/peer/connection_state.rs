use serde::Serialize;

/// Lifecycle of a [`PeerLink`](crate::peer::PeerLink).
///
/// `Failed` means a restart is scheduled but has not been issued yet. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Negotiating,
    Connected,
    Reconnecting,
    Failed,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    /// Reconnecting, or waiting for the next restart.
    pub fn is_recovering(self) -> bool {
        matches!(self, Self::Reconnecting | Self::Failed)
    }
}
