use crate::model::{Envelope, Participant, RoomId};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    #[error("relay connection closed")]
    Closed,

    #[error("relay protocol error: {0}")]
    Protocol(String),
}

/// One live connection to a relay.
///
/// The relay closes the connection by dropping its end of `inbound`;
/// the client closes it by dropping `outbound`.
pub struct RelayConnection {
    pub outbound: mpsc::UnboundedSender<Envelope>,
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
}

impl RelayConnection {
    /// Creates a connection and returns the relay-side ends alongside it.
    pub fn pair() -> (
        Self,
        mpsc::UnboundedReceiver<Envelope>,
        mpsc::UnboundedSender<Envelope>,
    ) {
        let (outbound, relay_rx) = mpsc::unbounded_channel();
        let (relay_tx, inbound) = mpsc::unbounded_channel();
        (Self { outbound, inbound }, relay_rx, relay_tx)
    }
}

/// Message-oriented transport to a signaling relay addressable by room id.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Opens a connection for `participant` in `room_id`. The caller still has to send `join`.
    async fn connect(
        &self,
        room_id: &RoomId,
        participant: &Participant,
    ) -> Result<RelayConnection, RelayError>;
}
