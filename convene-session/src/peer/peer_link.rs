use crate::config::PeerLinkConfig;
use crate::media::{MediaTrack, TrackKind};
use crate::peer::{
    ConnectionState, IceBuffer, LinkCommand, LinkEvent, LinkEventKind, PeerLinkStatus,
};
use crate::signaling::SignalingSender;
use crate::transport::{PeerTransport, PeerTransportFactory, TransportEvent, TransportState};
use anyhow::Result;
use convene_core::{
    IceCandidate, IceServerConfig, MediaState, NegotiationId, NegotiationRole, Participant,
    SignalBody, UserId,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Local tracks and flags a link sends to its peer.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMedia {
    pub state: MediaState,
    pub audio: Option<MediaTrack>,
    pub camera: Option<MediaTrack>,
    pub screen: Option<MediaTrack>,
}

impl OutgoingMedia {
    /// The track the video sender carries for the current state.
    pub fn video_track(&self) -> Option<MediaTrack> {
        if self.state.screen_sharing {
            self.screen.clone().or_else(|| self.camera.clone())
        } else {
            self.camera.clone()
        }
    }
}

/// Everything a link task needs to start.
pub struct LinkSetup {
    pub local: UserId,
    pub remote: Participant,
    pub role: NegotiationRole,
    pub generation: u64,
    pub config: PeerLinkConfig,
    pub ice_servers: Vec<IceServerConfig>,
    pub factory: Arc<dyn PeerTransportFactory>,
    pub signaling: SignalingSender,
    pub events: mpsc::UnboundedSender<LinkEvent>,
    pub media: OutgoingMedia,
}

/// Negotiation and recovery for the connection to one remote participant.
///
/// Runs as its own task and owns its transport. Offers, answers and candidates are
/// tagged with a [`NegotiationId`]; only the initiator ever creates offers.
pub struct PeerLink {
    local: UserId,
    remote: UserId,
    role: NegotiationRole,
    generation: u64,
    config: PeerLinkConfig,
    ice_servers: Vec<IceServerConfig>,
    factory: Arc<dyn PeerTransportFactory>,
    transport: Arc<dyn PeerTransport>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    signaling: SignalingSender,
    events: mpsc::UnboundedSender<LinkEvent>,
    status: watch::Sender<PeerLinkStatus>,

    state: ConnectionState,
    negotiation: Option<NegotiationId>,
    remote_applied: bool,
    ice_buffer: IceBuffer,

    media: OutgoingMedia,
    video: Option<MediaTrack>,

    restarts: u32,
    restart_at: Option<Instant>,
    deadline: Option<Instant>,
}

impl PeerLink {
    /// Creates the transport and drives the link until it closes.
    pub async fn launch(
        setup: LinkSetup,
        command_rx: mpsc::UnboundedReceiver<LinkCommand>,
        status: watch::Sender<PeerLinkStatus>,
    ) {
        let opened = open_transport(
            setup.factory.as_ref(),
            &setup.local,
            &setup.remote.user_id,
            &setup.ice_servers,
        )
        .await;

        match opened {
            Ok((transport, transport_rx)) => {
                let link = Self::new(setup, transport, transport_rx, command_rx, status);
                link.run().await;
            }
            Err(e) => {
                error!(
                    "Failed to create transport for {}: {:?}",
                    setup.remote.user_id, e
                );
                status.send_modify(|s| s.state = ConnectionState::Closed);
                for kind in [
                    LinkEventKind::StateChanged(ConnectionState::Closed),
                    LinkEventKind::Unreachable,
                ] {
                    let _ = setup.events.send(LinkEvent {
                        user_id: setup.remote.user_id.clone(),
                        generation: setup.generation,
                        kind,
                    });
                }
            }
        }
    }

    fn new(
        setup: LinkSetup,
        transport: Arc<dyn PeerTransport>,
        transport_rx: mpsc::Receiver<TransportEvent>,
        command_rx: mpsc::UnboundedReceiver<LinkCommand>,
        status: watch::Sender<PeerLinkStatus>,
    ) -> Self {
        Self {
            local: setup.local,
            remote: setup.remote.user_id,
            role: setup.role,
            generation: setup.generation,
            ice_buffer: IceBuffer::new(setup.config.ice_buffer_limit),
            config: setup.config,
            ice_servers: setup.ice_servers,
            factory: setup.factory,
            transport,
            transport_rx,
            command_rx,
            signaling: setup.signaling,
            events: setup.events,
            status,
            state: ConnectionState::Idle,
            negotiation: None,
            remote_applied: false,
            media: setup.media,
            video: None,
            restarts: 0,
            restart_at: None,
            deadline: None,
        }
    }

    async fn run(mut self) {
        info!(
            "Link {} -> {} started as {:?}",
            self.local, self.remote, self.role
        );

        self.attach_tracks().await;
        self.begin().await;

        while !self.state.is_closed() {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(c) => self.handle_command(c).await,
                    None => self.close().await,
                },

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                _ = sleep_until_opt(self.restart_at) => {
                    self.restart_at = None;
                    self.restart().await;
                }

                _ = sleep_until_opt(self.deadline) => {
                    self.deadline = None;
                    self.on_deadline().await;
                }
            }
        }

        debug!("Link {} -> {} finished", self.local, self.remote);
    }

    async fn begin(&mut self) {
        self.set_state(ConnectionState::Negotiating);

        if self.role.is_initiator() {
            self.send_offer(false).await;
        } else {
            self.arm_deadline();
        }
    }

    async fn handle_command(&mut self, cmd: LinkCommand) {
        self.touch();

        match cmd {
            LinkCommand::Offer { sdp, negotiation } => self.on_offer(sdp, negotiation).await,
            LinkCommand::Answer { sdp, negotiation } => self.on_answer(sdp, negotiation).await,
            LinkCommand::Ice {
                candidate,
                negotiation,
            } => self.on_remote_candidate(candidate, negotiation).await,
            LinkCommand::RemoteMedia(state) => {
                self.status
                    .send_modify(|s| s.last_remote_media = Some(state));
            }
            LinkCommand::UpdateOutgoingMedia { state, screen } => {
                self.update_outgoing_media(state, screen).await;
            }
            LinkCommand::Close => self.close().await,
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        self.touch();

        match event {
            TransportEvent::StateChanged(state) => self.on_transport_state(state).await,

            TransportEvent::CandidateGenerated(candidate) => match self.negotiation {
                Some(negotiation) => {
                    self.signaling.send_to(
                        &self.remote,
                        SignalBody::IceCandidate {
                            candidate,
                            negotiation,
                        },
                    );
                }
                None => debug!("Dropping local candidate for {}: no round yet", self.remote),
            },

            TransportEvent::RemoteTrack(track) => {
                self.emit(LinkEventKind::RemoteTrack(track));
            }

            TransportEvent::Quality(quality) => {
                self.status.send_modify(|s| s.quality = Some(quality));
                self.emit(LinkEventKind::Quality(quality));
            }
        }
    }

    async fn on_transport_state(&mut self, state: TransportState) {
        match state {
            TransportState::Connected => {
                if self.state.is_connected() {
                    return;
                }
                self.restarts = 0;
                self.restart_at = None;
                self.deadline = None;
                self.set_state(ConnectionState::Connected);
                self.announce_media();
            }

            TransportState::Disconnected => {
                if !self.state.is_connected() {
                    return;
                }
                warn!("Transport to {} disconnected", self.remote);
                self.set_state(ConnectionState::Reconnecting);
                self.schedule_restart().await;
            }

            TransportState::Failed | TransportState::Closed => {
                if self.state == ConnectionState::Failed {
                    return;
                }
                warn!("Transport to {} reported {:?}", self.remote, state);
                self.on_failure().await;
            }

            TransportState::New | TransportState::Connecting => {
                debug!("Transport to {} is {:?}", self.remote, state);
            }
        }
    }

    async fn on_offer(&mut self, sdp: String, negotiation: NegotiationId) {
        if self.role.is_initiator() {
            warn!("Ignoring offer from {}: local side initiates", self.remote);
            return;
        }

        if let Some(current) = self.negotiation {
            if current.epoch == negotiation.epoch {
                if negotiation.round <= current.round {
                    debug!(
                        "Ignoring stale offer {:?} from {}, current is {:?}",
                        negotiation, self.remote, current
                    );
                    return;
                }
            } else {
                // The remote side recreated its link. A fresh transport has to match it.
                info!("{} started a new negotiation epoch", self.remote);
                if let Err(e) = self.reset_transport().await {
                    error!("Failed to recreate transport for {}: {:?}", self.remote, e);
                    self.give_up().await;
                    return;
                }
            }
        }

        if let Err(e) = self.transport.set_remote_offer(sdp).await {
            warn!("Failed to apply offer from {}: {:?}", self.remote, e);
            self.on_failure().await;
            return;
        }
        self.negotiation = Some(negotiation);
        self.remote_applied = true;

        match self.transport.create_answer().await {
            Ok(answer) => {
                debug!("Sending answer {:?} to {}", negotiation, self.remote);
                self.signaling.send_to(
                    &self.remote,
                    SignalBody::Answer {
                        sdp: answer,
                        negotiation,
                    },
                );
            }
            Err(e) => {
                warn!("Failed to create answer for {}: {:?}", self.remote, e);
                self.on_failure().await;
                return;
            }
        }

        self.flush_candidates().await;

        match self.state {
            ConnectionState::Idle | ConnectionState::Negotiating => {
                self.set_state(ConnectionState::Negotiating);
                self.arm_deadline();
            }
            ConnectionState::Reconnecting | ConnectionState::Failed => {
                self.set_state(ConnectionState::Reconnecting);
                self.arm_deadline();
            }
            ConnectionState::Connected | ConnectionState::Closed => {}
        }
    }

    async fn on_answer(&mut self, sdp: String, negotiation: NegotiationId) {
        if !self.role.is_initiator() {
            warn!("Ignoring answer from {}: local side responds", self.remote);
            return;
        }
        if self.negotiation != Some(negotiation) {
            debug!(
                "Ignoring answer {:?} from {}, current is {:?}",
                negotiation, self.remote, self.negotiation
            );
            return;
        }
        if self.remote_applied {
            debug!("Duplicate answer {:?} from {}", negotiation, self.remote);
            return;
        }

        if let Err(e) = self.transport.set_remote_answer(sdp).await {
            warn!("Failed to apply answer from {}: {:?}", self.remote, e);
            self.on_failure().await;
            return;
        }
        self.remote_applied = true;
        self.flush_candidates().await;
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate, negotiation: NegotiationId) {
        let Some(current) = self.negotiation else {
            if self.role.is_initiator() {
                debug!("Dropping candidate from {}: no offer sent", self.remote);
            } else {
                self.ice_buffer.push(negotiation, candidate);
            }
            return;
        };

        if negotiation == current && self.remote_applied {
            self.apply_candidate(candidate).await;
            return;
        }

        let foreign = negotiation.epoch != current.epoch && self.role.is_initiator();
        if negotiation.precedes(&current) || foreign {
            debug!(
                "Dropping candidate {:?} from {}, current is {:?}",
                negotiation, self.remote, current
            );
            return;
        }

        self.ice_buffer.push(negotiation, candidate);
    }

    async fn flush_candidates(&mut self) {
        let Some(current) = self.negotiation else {
            return;
        };
        let ready = self.ice_buffer.take_for(&current);
        if !ready.is_empty() {
            debug!(
                "Applying {} buffered candidates from {}",
                ready.len(),
                self.remote
            );
        }
        for candidate in ready {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate from {}: {:?}", self.remote, e);
        }
    }

    async fn send_offer(&mut self, ice_restart: bool) {
        let negotiation = match self.negotiation {
            Some(current) => current.next(),
            None => NegotiationId::first(Uuid::new_v4()),
        };

        match self.transport.create_offer(ice_restart).await {
            Ok(sdp) => {
                self.negotiation = Some(negotiation);
                self.remote_applied = false;
                debug!("Sending offer {:?} to {}", negotiation, self.remote);
                self.signaling
                    .send_to(&self.remote, SignalBody::Offer { sdp, negotiation });
                self.arm_deadline();
            }
            Err(e) => {
                warn!("Failed to create offer for {}: {:?}", self.remote, e);
                self.on_failure().await;
            }
        }
    }

    async fn restart(&mut self) {
        if self.state.is_connected() || self.state.is_closed() {
            return;
        }
        info!(
            "ICE restart towards {} ({}/{})",
            self.remote, self.restarts, self.config.restart.max_attempts
        );
        self.set_state(ConnectionState::Reconnecting);
        self.send_offer(true).await;
    }

    async fn on_deadline(&mut self) {
        warn!(
            "Negotiation with {} timed out in state {:?}",
            self.remote, self.state
        );
        self.emit(LinkEventKind::NegotiationTimeout);
        self.on_failure().await;
    }

    async fn on_failure(&mut self) {
        self.set_state(ConnectionState::Failed);
        self.schedule_restart().await;
    }

    /// Books the next restart, or closes the link once the schedule is used up.
    ///
    /// The initiator sends the restart offer itself; the responder waits for it.
    async fn schedule_restart(&mut self) {
        self.deadline = None;
        self.restart_at = None;

        if self.config.restart.is_exhausted(self.restarts) {
            self.give_up().await;
            return;
        }

        let delay = self.config.restart.delay_for(self.restarts);
        self.restarts += 1;
        self.publish();

        if self.role.is_initiator() {
            debug!("Restart towards {} in {:?}", self.remote, delay);
            self.restart_at = Some(Instant::now() + delay);
        } else {
            self.deadline = Some(Instant::now() + delay + self.config.negotiation_timeout);
        }
    }

    async fn give_up(&mut self) {
        error!(
            "Link to {} unreachable after {} restarts",
            self.remote, self.restarts
        );
        self.shutdown_transport().await;
        self.set_state(ConnectionState::Closed);
        self.emit(LinkEventKind::Unreachable);
    }

    async fn close(&mut self) {
        self.shutdown_transport().await;
        self.state = ConnectionState::Closed;
        self.publish();
        info!("Link {} -> {} closed", self.local, self.remote);
    }

    async fn shutdown_transport(&mut self) {
        self.restart_at = None;
        self.deadline = None;
        self.ice_buffer.clear();
        if let Err(e) = self.transport.close().await {
            debug!("Closing transport to {}: {:?}", self.remote, e);
        }
    }

    async fn reset_transport(&mut self) -> Result<()> {
        if let Err(e) = self.transport.close().await {
            debug!("Closing transport to {}: {:?}", self.remote, e);
        }

        let (transport, transport_rx) = open_transport(
            self.factory.as_ref(),
            &self.local,
            &self.remote,
            &self.ice_servers,
        )
        .await?;
        self.transport = transport;
        self.transport_rx = transport_rx;
        self.negotiation = None;
        self.remote_applied = false;
        self.video = None;

        self.attach_tracks().await;
        Ok(())
    }

    async fn attach_tracks(&mut self) {
        if let Err(e) = self
            .transport
            .replace_track(TrackKind::Audio, self.media.audio.clone())
            .await
        {
            warn!("Failed to attach audio for {}: {:?}", self.remote, e);
        }

        let video = self.media.video_track();
        match self
            .transport
            .replace_track(TrackKind::Video, video.clone())
            .await
        {
            Ok(()) => self.video = video,
            Err(e) => warn!("Failed to attach video for {}: {:?}", self.remote, e),
        }
        self.publish();
    }

    /// Swaps the outgoing video track in place when the desired source changed.
    async fn update_outgoing_media(&mut self, state: MediaState, screen: Option<MediaTrack>) {
        self.media.state = state;
        self.media.screen = screen;

        let desired = self.media.video_track();
        let unchanged = match (&desired, &self.video) {
            (Some(want), Some(have)) => want.same_as(have),
            (None, None) => true,
            _ => false,
        };

        if !unchanged {
            match self
                .transport
                .replace_track(TrackKind::Video, desired.clone())
                .await
            {
                Ok(()) => {
                    debug!(
                        "Outgoing video for {} is now {:?}",
                        self.remote,
                        desired.as_ref().map(|t| t.id())
                    );
                    self.video = desired;
                }
                Err(e) => warn!("Failed to replace video for {}: {:?}", self.remote, e),
            }
        }

        self.publish();
    }

    fn announce_media(&self) {
        self.signaling
            .send_to(&self.remote, SignalBody::MediaStateUpdate(self.media.state));
    }

    fn arm_deadline(&mut self) {
        self.deadline = Some(Instant::now() + self.config.negotiation_timeout);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Link to {}: {:?} -> {:?}", self.remote, self.state, state);
        self.state = state;
        self.publish();
        self.emit(LinkEventKind::StateChanged(state));
    }

    fn publish(&self) {
        let state = self.state;
        let restarts = self.restarts;
        let video = self.video.as_ref().map(|t| t.id().to_owned());
        self.status.send_modify(|s| {
            s.state = state;
            s.restart_attempts = restarts;
            s.outgoing_video = video;
        });
    }

    fn touch(&self) {
        self.status.send_modify(|s| s.last_activity = Instant::now());
    }

    fn emit(&self, kind: LinkEventKind) {
        let _ = self.events.send(LinkEvent {
            user_id: self.remote.clone(),
            generation: self.generation,
            kind,
        });
    }
}

async fn open_transport(
    factory: &dyn PeerTransportFactory,
    local: &UserId,
    remote: &UserId,
    ice_servers: &[IceServerConfig],
) -> Result<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
    let (transport_tx, transport_rx) = mpsc::channel(256);
    let transport = factory
        .create(local, remote, ice_servers, transport_tx)
        .await?;
    Ok((transport, transport_rx))
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
