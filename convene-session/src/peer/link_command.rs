use crate::media::MediaTrack;
use convene_core::{IceCandidate, MediaState, NegotiationId};

/// Commands a [`PeerLink`](crate::peer::PeerLink) accepts from the coordinator.
#[derive(Debug)]
pub enum LinkCommand {
    Offer {
        sdp: String,
        negotiation: NegotiationId,
    },

    Answer {
        sdp: String,
        negotiation: NegotiationId,
    },

    Ice {
        candidate: IceCandidate,
        negotiation: NegotiationId,
    },

    /// The remote side announced its media state.
    RemoteMedia(MediaState),

    /// Local media state changed. `screen` is the screen track while sharing.
    UpdateOutgoingMedia {
        state: MediaState,
        screen: Option<MediaTrack>,
    },

    Close,
}
