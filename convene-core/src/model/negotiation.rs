use crate::model::participant::UserId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Which side of a pair creates offers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationRole {
    Initiator,
    Responder,
}

impl NegotiationRole {
    /// Role of `local` towards `remote`. The byte-wise smaller id initiates, so both sides
    /// derive complementary roles without talking to each other.
    ///
    /// Returns `None` for identical ids: such a pair has no valid role assignment.
    pub fn between(local: &UserId, remote: &UserId) -> Option<Self> {
        match local.as_str().as_bytes().cmp(remote.as_str().as_bytes()) {
            Ordering::Less => Some(Self::Initiator),
            Ordering::Greater => Some(Self::Responder),
            Ordering::Equal => None,
        }
    }

    pub fn is_initiator(self) -> bool {
        self == Self::Initiator
    }
}

/// Tags an offer/answer/candidate with the negotiation round it belongs to.
///
/// `epoch` names one link incarnation on the initiator side, `round` counts its offers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct NegotiationId {
    pub epoch: Uuid,
    pub round: u32,
}

impl NegotiationId {
    pub fn first(epoch: Uuid) -> Self {
        Self { epoch, round: 1 }
    }

    pub fn next(self) -> Self {
        Self {
            epoch: self.epoch,
            round: self.round.saturating_add(1),
        }
    }

    /// True when `self` belongs to the same incarnation and a strictly earlier round.
    pub fn precedes(&self, other: &NegotiationId) -> bool {
        self.epoch == other.epoch && self.round < other.round
    }
}
