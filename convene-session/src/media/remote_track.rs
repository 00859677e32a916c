use crate::media::TrackKind;
use convene_core::UserId;
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// An incoming track announced by a peer transport.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    /// The webrtc track when the transport is backed by a real peer connection.
    pub rtc: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Render-side collaborator. The session hands every remote track to it and never renders.
pub trait RemoteTrackRenderer: Send + Sync {
    fn on_remote_track(&self, user_id: &UserId, track: RemoteTrack);
}

/// Renderer that discards remote tracks.
pub struct NullRenderer;

impl RemoteTrackRenderer for NullRenderer {
    fn on_remote_track(&self, _user_id: &UserId, _track: RemoteTrack) {}
}
