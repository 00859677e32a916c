use convene_core::{Envelope, Participant, RELAY_USER_ID, SignalBody, UserId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    PeerJoined(Participant),
    PeerLeft(UserId),
}

/// Known members of the room, excluding the local participant.
///
/// A `roster` is diffed against the current set, so a full snapshot and
/// incremental `join`/`leave` produce the same kind of events.
pub struct PresenceTracker {
    local: UserId,
    members: BTreeMap<UserId, Participant>,
}

impl PresenceTracker {
    pub fn new(local: UserId) -> Self {
        Self {
            local,
            members: BTreeMap::new(),
        }
    }

    /// Feeds one presence envelope; other kinds yield nothing.
    pub fn apply(&mut self, envelope: &Envelope) -> Vec<PresenceEvent> {
        match &envelope.body {
            SignalBody::Join { participant } => {
                if participant.user_id != envelope.from_user_id {
                    warn!(
                        "Ignoring join for {} sent by {}",
                        participant.user_id, envelope.from_user_id
                    );
                    return Vec::new();
                }
                self.join(participant.clone()).into_iter().collect()
            }
            SignalBody::Leave => self.leave(&envelope.from_user_id).into_iter().collect(),
            SignalBody::Roster { members } => {
                if envelope.from_user_id.as_str() != RELAY_USER_ID {
                    warn!("Ignoring roster sent by {}", envelope.from_user_id);
                    return Vec::new();
                }
                self.replace(members)
            }
            _ => Vec::new(),
        }
    }

    fn join(&mut self, participant: Participant) -> Option<PresenceEvent> {
        if participant.user_id == self.local {
            return None;
        }
        if let Some(known) = self.members.get_mut(&participant.user_id) {
            debug!("{} is already present", participant.user_id);
            *known = participant;
            return None;
        }

        self.members
            .insert(participant.user_id.clone(), participant.clone());
        Some(PresenceEvent::PeerJoined(participant))
    }

    fn leave(&mut self, user_id: &UserId) -> Option<PresenceEvent> {
        self.members
            .remove(user_id)
            .map(|_| PresenceEvent::PeerLeft(user_id.clone()))
    }

    fn replace(&mut self, roster: &[Participant]) -> Vec<PresenceEvent> {
        let next: BTreeMap<UserId, Participant> = roster
            .iter()
            .filter(|p| p.user_id != self.local)
            .map(|p| (p.user_id.clone(), p.clone()))
            .collect();

        let mut events: Vec<PresenceEvent> = self
            .members
            .keys()
            .filter(|id| !next.contains_key(*id))
            .map(|id| PresenceEvent::PeerLeft(id.clone()))
            .collect();

        events.extend(
            next.values()
                .filter(|p| !self.members.contains_key(&p.user_id))
                .map(|p| PresenceEvent::PeerJoined(p.clone())),
        );

        self.members = next;
        events
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Participant> {
        self.members.get(user_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
