use crate::model::media::MediaState;
use crate::model::negotiation::NegotiationId;
use crate::model::participant::{Participant, UserId};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

/// Body of a signaling message; the tag becomes the envelope's `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum SignalBody {
    Join {
        participant: Participant,
    },
    Leave,
    Roster {
        members: Vec<Participant>,
    },
    Offer {
        sdp: String,
        negotiation: NegotiationId,
    },
    Answer {
        sdp: String,
        negotiation: NegotiationId,
    },
    IceCandidate {
        candidate: IceCandidate,
        negotiation: NegotiationId,
    },
    MediaStateUpdate(MediaState),
}

impl SignalBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::Roster { .. } => "roster",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::MediaStateUpdate(_) => "media-state-update",
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(self, Self::Join { .. } | Self::Leave | Self::Roster { .. })
    }
}

/// A signaling message as it travels through the relay.
///
/// Without `to_user_id` the message is a room broadcast, with it the message is point-to-point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub room_id: RoomId,
    pub from_user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_user_id: Option<UserId>,
    #[serde(flatten)]
    pub body: SignalBody,
    /// Milliseconds since the UNIX epoch at the sender.
    #[serde(default)]
    pub ts: u64,
}

impl Envelope {
    pub fn broadcast(room_id: RoomId, from_user_id: UserId, body: SignalBody) -> Self {
        Self {
            room_id,
            from_user_id,
            to_user_id: None,
            body,
            ts: now_millis(),
        }
    }

    pub fn direct(room_id: RoomId, from_user_id: UserId, to: UserId, body: SignalBody) -> Self {
        Self {
            room_id,
            from_user_id,
            to_user_id: Some(to),
            body,
            ts: now_millis(),
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to_user_id.is_none()
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
