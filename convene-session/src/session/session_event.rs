use crate::error::SessionError;
use crate::peer::ConnectionState;
use convene_core::{MediaState, Participant, UserId};

/// What a running session reports to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ParticipantJoined(Participant),
    ParticipantLeft(UserId),
    ConnectionStateChanged {
        user_id: UserId,
        state: ConnectionState,
    },
    RemoteMediaChanged {
        user_id: UserId,
        state: MediaState,
    },
    SignalingDisconnected,
    SignalingReconnected,
    /// Per-peer and media failures. The session keeps running unless the error is fatal.
    SessionError(SessionError),
    /// Last event of every session.
    SessionEnded,
}
