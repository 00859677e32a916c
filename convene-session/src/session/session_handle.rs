use crate::error::SessionError;
use crate::media::MediaDevices;
use crate::peer::PeerLinkStatus;
use crate::session::session_actor::LinkView;
use crate::session::session_command::SessionCommand;
use crate::session::{SessionEvent, SessionStatus};
use convene_core::{MediaState, Participant, RoomId, UserId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

/// Caller-side handle of a joined session.
///
/// All mutations are forwarded to the session task. Once the session has ended,
/// every request fails with [`SessionError::SessionClosed`] except `leave_session`.
pub struct SessionHandle {
    room_id: RoomId,
    local: Participant,
    devices: Arc<dyn MediaDevices>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    media: watch::Receiver<MediaState>,
    links: LinkView,
}

impl SessionHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        room_id: RoomId,
        local: Participant,
        devices: Arc<dyn MediaDevices>,
        commands: mpsc::UnboundedSender<SessionCommand>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        status: watch::Receiver<SessionStatus>,
        media: watch::Receiver<MediaState>,
        links: LinkView,
    ) -> Self {
        Self {
            room_id,
            local,
            devices,
            commands,
            events,
            status,
            media,
            links,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn local_participant(&self) -> &Participant {
        &self.local
    }

    pub fn is_active(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Closes all links, releases local media and sends `leave`.
    ///
    /// Returns once all of that is done. Calling it on an ended session is a no-op.
    pub async fn leave_session(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Leave { reply: reply_tx })
            .is_err()
        {
            return Ok(());
        }
        let _ = reply_rx.await;
        Ok(())
    }

    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetAudio { enabled, reply })
            .await
    }

    pub async fn set_video_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetVideo { enabled, reply })
            .await
    }

    /// Acquires a screen track and swaps it in as outgoing video on every link.
    pub async fn start_screen_share(&self) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::SessionClosed);
        }
        if self.media.borrow().screen_sharing {
            return Ok(());
        }

        let track = self.devices.acquire_screen_track().await.map_err(|e| {
            warn!("Screen capture unavailable: {}", e);
            SessionError::ScreenShareUnavailable(e.to_string())
        })?;

        let started = self
            .request(|reply| SessionCommand::StartScreenShare {
                track: track.clone(),
                reply,
            })
            .await;
        if started.is_err() {
            self.devices.release(&track);
        }
        started
    }

    /// Restores the camera track on every link and releases the screen track.
    pub async fn stop_screen_share(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::StopScreenShare { reply })
            .await
    }

    /// Replaces the link to `user_id` with a fresh one. Returns false for unknown participants.
    pub async fn reconnect_peer(&self, user_id: &UserId) -> Result<bool, SessionError> {
        let user_id = user_id.clone();
        self.request(|reply| SessionCommand::ReconnectPeer { user_id, reply })
            .await
    }

    /// Next session event; `None` after the session task is gone and all events were read.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn media_state(&self) -> MediaState {
        *self.media.borrow()
    }

    /// Current links ordered by user id.
    pub fn peer_links(&self) -> Vec<PeerLinkStatus> {
        let mut links: Vec<PeerLinkStatus> = self
            .links
            .iter()
            .map(|entry| entry.value().borrow().clone())
            .collect();
        links.sort_by(|a, b| a.user_id().cmp(b.user_id()));
        links
    }

    pub fn peer_link(&self, user_id: &UserId) -> Option<PeerLinkStatus> {
        self.links
            .get(user_id)
            .map(|entry| entry.value().borrow().clone())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .map_err(|_| SessionError::SessionClosed)?;
        reply_rx.await.map_err(|_| SessionError::SessionClosed)
    }
}
