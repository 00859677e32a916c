use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{LocalTracks, MediaDevices, MediaTrack, RemoteTrackRenderer};
use crate::peer::{
    LinkCommand, LinkEvent, LinkEventKind, LinkSetup, OutgoingMedia, PeerLinkHandle,
    PeerLinkStatus,
};
use crate::presence::{PresenceEvent, PresenceTracker};
use crate::session::session_command::SessionCommand;
use crate::session::{SessionEvent, SessionStatus, SignalingStatus};
use crate::signaling::{ChannelEvent, SignalingChannel, SignalingSender};
use crate::transport::PeerTransportFactory;
use convene_core::{Envelope, MediaState, NegotiationRole, Participant, RoomId, SignalBody, UserId};
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Shared read-only view of link statuses, written only by the actor.
pub(crate) type LinkView = Arc<DashMap<UserId, watch::Receiver<PeerLinkStatus>>>;

pub(crate) struct SessionSetup {
    pub room_id: RoomId,
    pub local: Participant,
    pub config: SessionConfig,
    pub peers: Arc<dyn PeerTransportFactory>,
    pub devices: Arc<dyn MediaDevices>,
    pub renderer: Arc<dyn RemoteTrackRenderer>,
    pub channel: SignalingChannel,
    pub channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    pub command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub tracks: LocalTracks,
    pub media: MediaState,
    pub media_tx: watch::Sender<MediaState>,
    pub status_tx: watch::Sender<SessionStatus>,
    pub link_view: LinkView,
}

/// Single owner of the peer map, presence and local media state of one session.
///
/// Every insertion into or removal from the peer map happens on this task, so a
/// departing peer and a late event from its link can never race.
pub(crate) struct SessionActor {
    room_id: RoomId,
    local: Participant,
    config: SessionConfig,
    peers: Arc<dyn PeerTransportFactory>,
    devices: Arc<dyn MediaDevices>,
    renderer: Arc<dyn RemoteTrackRenderer>,

    channel: Option<SignalingChannel>,
    signaling: SignalingSender,
    channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    signaling_status: SignalingStatus,

    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,

    presence: PresenceTracker,
    links: HashMap<UserId, PeerLinkHandle>,
    link_view: LinkView,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    rebuilds: HashMap<UserId, u32>,
    next_generation: u64,

    tracks: LocalTracks,
    screen: Option<MediaTrack>,
    media: MediaState,
    media_tx: watch::Sender<MediaState>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionActor {
    pub(crate) fn new(setup: SessionSetup) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let signaling = setup.channel.sender();

        Self {
            presence: PresenceTracker::new(setup.local.user_id.clone()),
            room_id: setup.room_id,
            local: setup.local,
            config: setup.config,
            peers: setup.peers,
            devices: setup.devices,
            renderer: setup.renderer,
            channel: Some(setup.channel),
            signaling,
            channel_rx: setup.channel_rx,
            signaling_status: SignalingStatus::Connected,
            command_rx: setup.command_rx,
            events: setup.events,
            links: HashMap::new(),
            link_view: setup.link_view,
            link_tx,
            link_rx,
            rebuilds: HashMap::new(),
            next_generation: 0,
            tracks: setup.tracks,
            screen: None,
            media: setup.media,
            media_tx: setup.media_tx,
            status_tx: setup.status_tx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            "Session for {} in room {} started",
            self.local.user_id, self.room_id
        );

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let keep_running = match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            self.shutdown(SignalingStatus::Closed).await;
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }

                Some(event) = self.channel_rx.recv() => {
                    if let ChannelEvent::Lost { attempts } = event {
                        error!("Signaling for room {} lost", self.room_id);
                        self.emit(SessionEvent::SessionError(SessionError::ChannelLost {
                            attempts,
                        }));
                        self.shutdown(SignalingStatus::Lost).await;
                        break;
                    }
                    self.handle_channel_event(event).await;
                }

                Some(event) = self.link_rx.recv() => self.handle_link_event(event).await,
            }
        }

        info!(
            "Session for {} in room {} finished",
            self.local.user_id, self.room_id
        );
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::SetAudio { enabled, reply } => {
                let enabled = match &self.tracks.audio {
                    Some(track) => {
                        track.set_enabled(enabled);
                        enabled
                    }
                    None => false,
                };
                self.apply_media(MediaState {
                    audio_enabled: enabled,
                    ..self.media
                });
                let _ = reply.send(());
            }

            SessionCommand::SetVideo { enabled, reply } => {
                let enabled = match &self.tracks.video {
                    Some(track) => {
                        track.set_enabled(enabled);
                        enabled
                    }
                    None => false,
                };
                self.apply_media(MediaState {
                    video_enabled: enabled,
                    ..self.media
                });
                let _ = reply.send(());
            }

            SessionCommand::StartScreenShare { track, reply } => {
                if self.media.screen_sharing {
                    debug!("Screen share already active, releasing {}", track.id());
                    self.devices.release(&track);
                } else {
                    info!("Screen share started with {}", track.id());
                    self.screen = Some(track);
                    self.apply_media(MediaState {
                        screen_sharing: true,
                        ..self.media
                    });
                }
                let _ = reply.send(());
            }

            SessionCommand::StopScreenShare { reply } => {
                if let Some(track) = self.screen.take() {
                    info!("Screen share stopped");
                    self.apply_media(MediaState {
                        screen_sharing: false,
                        ..self.media
                    });
                    self.devices.release(&track);
                }
                let _ = reply.send(());
            }

            SessionCommand::ReconnectPeer { user_id, reply } => {
                let known = self.reconnect_peer(&user_id).await;
                let _ = reply.send(known);
            }

            SessionCommand::Leave { reply } => {
                self.shutdown(SignalingStatus::Closed).await;
                let _ = reply.send(());
                return false;
            }
        }

        true
    }

    async fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(envelope) => self.handle_envelope(envelope).await,

            ChannelEvent::Disconnected => {
                self.signaling_status = SignalingStatus::Reconnecting;
                self.publish_status();
                self.emit(SessionEvent::SignalingDisconnected);
            }

            ChannelEvent::Reconnected => {
                self.signaling_status = SignalingStatus::Connected;
                self.publish_status();
                self.emit(SessionEvent::SignalingReconnected);
            }

            ChannelEvent::Lost { .. } => {}
        }
    }

    async fn handle_envelope(&mut self, envelope: Envelope) {
        if envelope.room_id != self.room_id {
            debug!(
                "Ignoring {} for foreign room {}",
                envelope.body.kind(),
                envelope.room_id
            );
            return;
        }

        if envelope.body.is_presence() {
            for event in self.presence.apply(&envelope) {
                match event {
                    PresenceEvent::PeerJoined(participant) => {
                        info!("{} joined room {}", participant.user_id, self.room_id);
                        self.add_peer(participant.clone());
                        self.emit(SessionEvent::ParticipantJoined(participant));
                    }
                    PresenceEvent::PeerLeft(user_id) => {
                        info!("{} left room {}", user_id, self.room_id);
                        self.remove_peer(&user_id).await;
                        self.emit(SessionEvent::ParticipantLeft(user_id));
                    }
                }
            }
            return;
        }

        let kind = envelope.body.kind();
        let from = envelope.from_user_id;

        let cmd = match envelope.body {
            SignalBody::Offer { sdp, negotiation } => LinkCommand::Offer { sdp, negotiation },
            SignalBody::Answer { sdp, negotiation } => LinkCommand::Answer { sdp, negotiation },
            SignalBody::IceCandidate {
                candidate,
                negotiation,
            } => LinkCommand::Ice {
                candidate,
                negotiation,
            },
            SignalBody::MediaStateUpdate(state) => {
                if !self.presence.contains(&from) {
                    debug!("Dropping media state from unknown peer {}", from);
                    return;
                }
                if let Some(link) = self.links.get(&from) {
                    link.send(LinkCommand::RemoteMedia(state));
                }
                self.emit(SessionEvent::RemoteMediaChanged {
                    user_id: from,
                    state,
                });
                return;
            }
            _ => return,
        };

        if matches!(cmd, LinkCommand::Offer { .. }) {
            self.revive_closed_link(&from).await;
        }

        match self.links.get(&from) {
            Some(link) => {
                if !link.send(cmd) {
                    debug!("Link to {} is closed, dropping {}", from, kind);
                }
            }
            None => debug!("Dropping {} from unknown peer {}", kind, from),
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        let current = self.links.get(&event.user_id).map(|link| link.generation());
        if current != Some(event.generation) {
            debug!("Ignoring event from a replaced link to {}", event.user_id);
            return;
        }

        match event.kind {
            LinkEventKind::StateChanged(state) => {
                self.publish_status();
                self.emit(SessionEvent::ConnectionStateChanged {
                    user_id: event.user_id,
                    state,
                });
            }
            LinkEventKind::RemoteTrack(track) => {
                debug!("Remote {:?} track {} from {}", track.kind, track.id, event.user_id);
                self.renderer.on_remote_track(&event.user_id, track);
            }
            LinkEventKind::Quality(_) => self.publish_status(),
            LinkEventKind::NegotiationTimeout => {
                self.emit(SessionEvent::SessionError(SessionError::NegotiationTimeout(
                    event.user_id,
                )));
            }
            LinkEventKind::Unreachable => self.on_unreachable(event.user_id).await,
        }
    }

    async fn on_unreachable(&mut self, user_id: UserId) {
        let used = self.rebuilds.get(&user_id).copied().unwrap_or(0);

        if used < self.config.peer.max_rebuilds {
            if let Some(participant) = self.presence.get(&user_id).cloned() {
                info!(
                    "Rebuilding link to {} ({}/{})",
                    user_id,
                    used + 1,
                    self.config.peer.max_rebuilds
                );
                self.rebuilds.insert(user_id, used + 1);
                self.replace_link(participant).await;
                return;
            }
        }

        // The closed link stays registered until the participant leaves.
        warn!("Peer {} is unreachable", user_id);
        self.publish_status();
        self.emit(SessionEvent::SessionError(SessionError::PeerUnreachable(
            user_id,
        )));
    }

    async fn reconnect_peer(&mut self, user_id: &UserId) -> bool {
        let Some(participant) = self.presence.get(user_id).cloned() else {
            return false;
        };
        info!("Reconnecting to {} on request", user_id);
        self.rebuilds.remove(user_id);
        self.replace_link(participant).await;
        true
    }

    /// An offer for a link that already gave up means the initiator started over.
    /// The responder side gets a fresh link so the offer has somewhere to land.
    async fn revive_closed_link(&mut self, user_id: &UserId) {
        let Some(link) = self.links.get(user_id) else {
            return;
        };
        let status = link.status();
        if !status.state.is_closed() || status.role.is_initiator() {
            return;
        }
        let Some(participant) = self.presence.get(user_id).cloned() else {
            return;
        };

        info!("{} offered again, recreating the closed link", user_id);
        self.rebuilds.remove(user_id);
        self.replace_link(participant).await;
    }

    fn add_peer(&mut self, participant: Participant) {
        if self.links.contains_key(&participant.user_id) {
            return;
        }
        let Some(role) = NegotiationRole::between(&self.local.user_id, &participant.user_id) else {
            warn!(
                "Ignoring {}: it shares the local user id",
                participant.user_id
            );
            return;
        };

        self.spawn_link(participant, role);
        self.publish_status();
    }

    async fn remove_peer(&mut self, user_id: &UserId) {
        self.rebuilds.remove(user_id);
        self.link_view.remove(user_id);

        if let Some(link) = self.links.remove(user_id) {
            debug!("Closing link to {}", user_id);
            link.close(self.config.peer.close_timeout).await;
        }
        self.publish_status();
    }

    async fn replace_link(&mut self, participant: Participant) {
        let Some(role) = NegotiationRole::between(&self.local.user_id, &participant.user_id) else {
            return;
        };

        if let Some(old) = self.links.remove(&participant.user_id) {
            old.close(self.config.peer.close_timeout).await;
        }
        self.spawn_link(participant, role);
        self.publish_status();
    }

    fn spawn_link(&mut self, participant: Participant, role: NegotiationRole) {
        self.next_generation += 1;

        let setup = LinkSetup {
            local: self.local.user_id.clone(),
            remote: participant.clone(),
            role,
            generation: self.next_generation,
            config: self.config.peer.clone(),
            ice_servers: self.config.ice_servers.clone(),
            factory: self.peers.clone(),
            signaling: self.signaling.clone(),
            events: self.link_tx.clone(),
            media: self.outgoing_media(),
        };

        let link = PeerLinkHandle::spawn(setup);
        self.link_view
            .insert(participant.user_id.clone(), link.subscribe());
        self.links.insert(participant.user_id, link);
    }

    /// Applies a new local media state and fans it out to every link and the room.
    fn apply_media(&mut self, next: MediaState) {
        if next == self.media {
            return;
        }
        info!("Local media state changed to {:?}", next);
        self.media = next;
        self.media_tx.send_replace(next);

        for link in self.links.values() {
            link.send(LinkCommand::UpdateOutgoingMedia {
                state: next,
                screen: self.screen.clone(),
            });
        }
        self.signaling.broadcast(SignalBody::MediaStateUpdate(next));
    }

    fn outgoing_media(&self) -> OutgoingMedia {
        OutgoingMedia {
            state: self.media,
            audio: self.tracks.audio.clone(),
            camera: self.tracks.video.clone(),
            screen: self.screen.clone(),
        }
    }

    /// Closes every link, releases local media and leaves the room.
    async fn shutdown(&mut self, signaling: SignalingStatus) {
        info!("Leaving room {}", self.room_id);

        let timeout = self.config.peer.close_timeout;
        join_all(self.links.drain().map(|(_, link)| link.close(timeout))).await;
        self.link_view.clear();
        self.rebuilds.clear();

        for track in self.tracks.iter() {
            self.devices.release(track);
        }
        if let Some(screen) = self.screen.take() {
            self.devices.release(&screen);
        }

        if let Some(channel) = self.channel.take() {
            channel.leave().await;
        }

        self.signaling_status = signaling;
        self.publish_status();
        self.emit(SessionEvent::SessionEnded);
    }

    fn publish_status(&self) {
        let links: Vec<PeerLinkStatus> = self.links.values().map(|link| link.status()).collect();
        self.status_tx
            .send_replace(SessionStatus::aggregate(self.signaling_status, &links));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
