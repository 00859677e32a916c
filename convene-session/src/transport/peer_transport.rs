use crate::media::{MediaTrack, TrackKind};
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use convene_core::{IceCandidate, IceServerConfig, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The media connection to one remote participant.
///
/// Implementations report asynchronous happenings through the event sender
/// they were created with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates a local offer and applies it as the local description.
    async fn create_offer(&self, ice_restart: bool) -> Result<String>;

    /// Creates a local answer and applies it as the local description.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_offer(&self, sdp: String) -> Result<()>;

    async fn set_remote_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swaps the track behind the outgoing sender of `kind` without renegotiating.
    async fn replace_track(&self, kind: TrackKind, track: Option<MediaTrack>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    async fn create(
        &self,
        local: &UserId,
        remote: &UserId,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
