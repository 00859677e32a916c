use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{LocalTracks, MediaDevices, NullRenderer, RemoteTrackRenderer};
use crate::peer::PeerLinkStatus;
use crate::session::session_actor::{SessionActor, SessionSetup};
use crate::session::{SessionEvent, SessionHandle, SessionStatus, SignalingStatus};
use crate::signaling::SignalingChannel;
use crate::transport::PeerTransportFactory;
use convene_core::{MediaState, Participant, RELAY_USER_ID, RoomId, SignalingTransport};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Entry point: joins rooms with a fixed set of collaborators.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use convene_session::*;
/// # use convene_core::{Participant, RoomId};
/// # async fn run() -> Result<(), SessionError> {
/// let coordinator = SessionCoordinator::new(
///     SessionConfig::default(),
///     Arc::new(WsSignalingTransport::new("ws://localhost:8080")),
///     Arc::new(RtcTransportFactory),
///     Arc::new(SampleTrackDevices::new()),
/// );
/// let mut session = coordinator
///     .join_session(RoomId::from("R1"), Participant::new("alice", "Alice"))
///     .await?;
/// while let Some(event) = session.next_event().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionCoordinator {
    config: SessionConfig,
    signaling: Arc<dyn SignalingTransport>,
    peers: Arc<dyn PeerTransportFactory>,
    devices: Arc<dyn MediaDevices>,
    renderer: Arc<dyn RemoteTrackRenderer>,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionConfig,
        signaling: Arc<dyn SignalingTransport>,
        peers: Arc<dyn PeerTransportFactory>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        Self {
            config,
            signaling,
            peers,
            devices,
            renderer: Arc::new(NullRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RemoteTrackRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Acquires local media, joins the room and starts the session task.
    ///
    /// A media failure does not abort the join: the session runs receive-only and the
    /// failure is the first event. Fails with `ChannelLost` when the relay stays unreachable.
    pub async fn join_session(
        &self,
        room_id: RoomId,
        participant: Participant,
    ) -> Result<SessionHandle, SessionError> {
        if participant.user_id.is_empty() {
            return Err(SessionError::InvalidParticipant(
                "user id must not be empty".into(),
            ));
        }
        if participant.user_id.as_str() == RELAY_USER_ID {
            return Err(SessionError::InvalidParticipant(format!(
                "{} is reserved",
                RELAY_USER_ID
            )));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let tracks = match self.devices.acquire_local_tracks(&self.config.media).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Joining room {} receive-only: {}", room_id, e);
                let _ = event_tx.send(SessionEvent::SessionError(e.into()));
                LocalTracks::default()
            }
        };
        let media = MediaState {
            audio_enabled: tracks.audio.is_some(),
            video_enabled: tracks.video.is_some(),
            screen_sharing: false,
        };

        let joined = SignalingChannel::join(
            self.signaling.clone(),
            room_id.clone(),
            participant.clone(),
            self.config.signaling.clone(),
        )
        .await;
        let (channel, channel_rx) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                for track in tracks.iter() {
                    self.devices.release(track);
                }
                return Err(e);
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = watch::channel(media);
        let (status_tx, status_rx) = watch::channel(SessionStatus::aggregate(
            SignalingStatus::Connected,
            Vec::<&PeerLinkStatus>::new(),
        ));
        let link_view = Arc::new(DashMap::new());

        let actor = SessionActor::new(SessionSetup {
            room_id: room_id.clone(),
            local: participant.clone(),
            config: self.config.clone(),
            peers: self.peers.clone(),
            devices: self.devices.clone(),
            renderer: self.renderer.clone(),
            channel,
            channel_rx,
            command_rx,
            events: event_tx,
            tracks,
            media,
            media_tx,
            status_tx,
            link_view: link_view.clone(),
        });
        tokio::spawn(actor.run());

        info!("{} joined room {}", participant.user_id, room_id);

        Ok(SessionHandle::new(
            room_id,
            participant,
            self.devices.clone(),
            command_tx,
            event_rx,
            status_rx,
            media_rx,
            link_view,
        ))
    }
}
