use convene_core::{BackoffPolicy, IceServerConfig};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub signaling: SignalingConfig,
    pub peer: PeerLinkConfig,
    pub media: MediaConstraints,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingConfig::default(),
            peer: PeerLinkConfig::default(),
            media: MediaConstraints::default(),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignalingConfig {
    /// Reconnection schedule of the relay connection.
    pub reconnect: BackoffPolicy,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            reconnect: BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeerLinkConfig {
    /// A negotiation round that has not connected within this window counts as failed.
    #[serde(rename = "negotiationTimeoutMs", with = "convene_core::duration_ms")]
    pub negotiation_timeout: Duration,
    /// ICE restart schedule; `max_attempts` failed restarts close the link.
    pub restart: BackoffPolicy,
    /// How often the coordinator recreates an exhausted link from scratch.
    pub max_rebuilds: u32,
    pub ice_buffer_limit: usize,
    #[serde(rename = "closeTimeoutMs", with = "convene_core::duration_ms")]
    pub close_timeout: Duration,
}

impl Default for PeerLinkConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_secs(30),
            restart: BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 3),
            max_rebuilds: 0,
            ice_buffer_limit: 256,
            close_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}
