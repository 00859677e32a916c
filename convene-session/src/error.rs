use convene_core::UserId;
use thiserror::Error;

/// Failure to obtain a local capture device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaAccessError {
    #[error("permission to use {0} was denied")]
    PermissionDenied(String),

    #[error("no {0} device available")]
    NotFound(String),

    #[error("{0} device is busy")]
    Busy(String),
}

/// Errors surfaced to the caller of a session, either returned or sent as events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The relay stayed unreachable through the whole reconnection schedule. The session is over.
    #[error("signaling channel lost after {attempts} reconnection attempts")]
    ChannelLost { attempts: u32 },

    #[error("media access failed: {0}")]
    MediaAccess(#[from] MediaAccessError),

    #[error("negotiation with {0} timed out")]
    NegotiationTimeout(UserId),

    #[error("peer {0} is unreachable")]
    PeerUnreachable(UserId),

    #[error("screen share unavailable: {0}")]
    ScreenShareUnavailable(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("invalid participant: {0}")]
    InvalidParticipant(String),
}

impl SessionError {
    /// Errors after which the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChannelLost { .. } | Self::SessionClosed)
    }
}
