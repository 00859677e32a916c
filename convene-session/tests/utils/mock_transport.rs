use anyhow::Result;
use async_trait::async_trait;
use convene_core::{IceCandidate, IceServerConfig, UserId};
use convene_session::{
    MediaTrack, PeerTransport, PeerTransportFactory, TrackKind, TransportEvent, TransportState,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct MockState {
    has_local: bool,
    has_remote: bool,
    connected: bool,
    closed: bool,
    offers: u32,
    restart_offers: u32,
    answers: u32,
    applied: Vec<IceCandidate>,
    applied_early: bool,
    audio: Option<String>,
    video: Option<String>,
    replacements: u32,
}

/// Scripted peer transport: it "connects" once both descriptions are set.
///
/// Every created description also yields one local candidate.
pub struct MockTransport {
    pub local: UserId,
    pub remote: UserId,
    reachable: bool,
    events: mpsc::Sender<TransportEvent>,
    state: Mutex<MockState>,
}

impl MockTransport {
    fn new(
        local: UserId,
        remote: UserId,
        reachable: bool,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            local,
            remote,
            reachable,
            events,
            state: Mutex::new(MockState::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }

    async fn gather(&self, n: u32) {
        let candidate = IceCandidate {
            candidate: format!(
                "candidate:{} 1 udp 2130706431 127.0.0.1 {} typ host",
                n,
                40000 + n
            ),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        };
        self.emit(TransportEvent::CandidateGenerated(candidate))
            .await;
    }

    async fn maybe_connect(&self) {
        let connect = self.with_state(|s| {
            let ready = self.reachable && s.has_local && s.has_remote && !s.connected && !s.closed;
            if ready {
                s.connected = true;
            }
            ready
        });

        if connect {
            self.emit(TransportEvent::StateChanged(TransportState::Connecting))
                .await;
            self.emit(TransportEvent::StateChanged(TransportState::Connected))
                .await;
        }
    }

    /// Simulates a network drop; both descriptions have to be renegotiated.
    pub async fn disconnect(&self) {
        self.with_state(|s| {
            s.connected = false;
            s.has_local = false;
            s.has_remote = false;
        });
        self.emit(TransportEvent::StateChanged(TransportState::Disconnected))
            .await;
    }

    /// Simulates the transport recovering on its own.
    pub async fn recover(&self) {
        self.with_state(|s| {
            s.connected = true;
            s.has_local = true;
            s.has_remote = true;
        });
        self.emit(TransportEvent::StateChanged(TransportState::Connected))
            .await;
    }

    pub fn offers(&self) -> u32 {
        self.with_state(|s| s.offers)
    }

    pub fn restart_offers(&self) -> u32 {
        self.with_state(|s| s.restart_offers)
    }

    pub fn answers(&self) -> u32 {
        self.with_state(|s| s.answers)
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.with_state(|s| s.applied.clone())
    }

    /// True if any candidate was applied before a remote description existed.
    pub fn applied_early(&self) -> bool {
        self.with_state(|s| s.applied_early)
    }

    pub fn audio_track(&self) -> Option<String> {
        self.with_state(|s| s.audio.clone())
    }

    pub fn video_track(&self) -> Option<String> {
        self.with_state(|s| s.video.clone())
    }

    pub fn replacements(&self) -> u32 {
        self.with_state(|s| s.replacements)
    }

    pub fn is_closed(&self) -> bool {
        self.with_state(|s| s.closed)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let n = self.with_state(|s| {
            s.offers += 1;
            if ice_restart {
                s.restart_offers += 1;
            }
            s.has_local = true;
            s.offers
        });
        self.gather(n).await;
        self.maybe_connect().await;
        Ok(format!("offer {} -> {} #{}", self.local, self.remote, n))
    }

    async fn create_answer(&self) -> Result<String> {
        let n = self.with_state(|s| {
            s.answers += 1;
            s.has_local = true;
            s.answers
        });
        self.gather(100 + n).await;
        self.maybe_connect().await;
        Ok(format!("answer {} -> {} #{}", self.local, self.remote, n))
    }

    async fn set_remote_offer(&self, _sdp: String) -> Result<()> {
        self.with_state(|s| s.has_remote = true);
        self.maybe_connect().await;
        Ok(())
    }

    async fn set_remote_answer(&self, _sdp: String) -> Result<()> {
        self.with_state(|s| s.has_remote = true);
        self.maybe_connect().await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.with_state(|s| {
            if !s.has_remote {
                s.applied_early = true;
            }
            s.applied.push(candidate);
        });
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<MediaTrack>) -> Result<()> {
        let id = track.map(|t| t.id().to_owned());
        self.with_state(|s| {
            s.replacements += 1;
            match kind {
                TrackKind::Audio => s.audio = id,
                TrackKind::Video => s.video = id,
            }
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.with_state(|s| s.closed = true);
        Ok(())
    }
}

#[derive(Default)]
struct FactoryState {
    transports: Vec<Arc<MockTransport>>,
    unreachable: HashSet<UserId>,
}

/// Hands out [`MockTransport`]s and remembers every one of them.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transports created towards `remote` from now on never connect.
    pub fn set_unreachable(&self, remote: &str, unreachable: bool) {
        let mut state = self.state.lock().unwrap();
        if unreachable {
            state.unreachable.insert(UserId::from(remote));
        } else {
            state.unreachable.remove(&UserId::from(remote));
        }
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().transports.len()
    }

    pub fn created_between(&self, local: &str, remote: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .transports
            .iter()
            .filter(|t| t.local.as_str() == local && t.remote.as_str() == remote)
            .count()
    }

    /// The most recent transport `local` created towards `remote`.
    pub fn transport(&self, local: &str, remote: &str) -> Option<Arc<MockTransport>> {
        self.state
            .lock()
            .unwrap()
            .transports
            .iter()
            .rev()
            .find(|t| t.local.as_str() == local && t.remote.as_str() == remote)
            .cloned()
    }
}

#[async_trait]
impl PeerTransportFactory for MockTransportFactory {
    async fn create(
        &self,
        local: &UserId,
        remote: &UserId,
        _ice_servers: &[IceServerConfig],
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let mut state = self.state.lock().unwrap();
        let reachable = !state.unreachable.contains(remote);
        let transport = Arc::new(MockTransport::new(
            local.clone(),
            remote.clone(),
            reachable,
            events,
        ));
        state.transports.push(transport.clone());
        Ok(transport)
    }
}
