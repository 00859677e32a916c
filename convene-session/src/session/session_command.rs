use crate::media::MediaTrack;
use convene_core::UserId;
use tokio::sync::oneshot;

pub(crate) enum SessionCommand {
    SetAudio {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    SetVideo {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    /// The handle acquired a screen track; the actor owns it from here on.
    StartScreenShare {
        track: MediaTrack,
        reply: oneshot::Sender<()>,
    },
    StopScreenShare {
        reply: oneshot::Sender<()>,
    },
    ReconnectPeer {
        user_id: UserId,
        reply: oneshot::Sender<bool>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}
