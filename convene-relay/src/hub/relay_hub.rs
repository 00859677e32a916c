use crate::hub::RelayConfig;
use convene_core::{Envelope, Participant, RELAY_USER_ID, RoomId, SignalBody, UserId, now_millis};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A room member as the relay sees it.
struct Member {
    participant: Participant,
    conn_id: u64,
    /// `None` while the member is inside its presence grace window.
    tx: Option<mpsc::UnboundedSender<Envelope>>,
    kill: Option<oneshot::Sender<()>>,
}

struct HubInner {
    rooms: DashMap<RoomId, HashMap<UserId, Member>>,
    next_conn_id: AtomicU64,
    config: RelayConfig,
}

/// Room registry and router of the signaling relay.
///
/// The hub never looks into negotiation payloads. It tracks membership, answers joins
/// with a roster and forwards everything else either to one member or to the whole room.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: DashMap::new(),
                next_conn_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Drives one client connection until it leaves, drops or gets replaced.
    ///
    /// The first envelope must be a `join`.
    pub async fn serve(
        &self,
        room_id: RoomId,
        mut inbound: mpsc::UnboundedReceiver<Envelope>,
        outbound: mpsc::UnboundedSender<Envelope>,
    ) {
        let conn_id = self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed);

        let participant = match inbound.recv().await {
            Some(Envelope {
                body: SignalBody::Join { participant },
                ..
            }) => participant,
            Some(other) => {
                warn!(
                    "Connection {} in room {} opened with '{}' instead of join",
                    conn_id,
                    room_id,
                    other.body.kind()
                );
                return;
            }
            None => return,
        };

        if participant.user_id.is_empty() || participant.user_id.as_str() == RELAY_USER_ID {
            warn!("Rejecting join with reserved or empty user id in room {}", room_id);
            return;
        }

        let user_id = participant.user_id.clone();
        let (kill_tx, mut kill_rx) = oneshot::channel();
        self.attach(&room_id, participant, conn_id, outbound, kill_tx);

        let mut left = false;
        loop {
            tokio::select! {
                _ = &mut kill_rx => {
                    debug!("Connection {} of {} closed by relay", conn_id, user_id);
                    break;
                }
                msg = inbound.recv() => {
                    let Some(envelope) = msg else { break };
                    match envelope.body {
                        SignalBody::Leave => {
                            self.leave(&room_id, &user_id, conn_id);
                            left = true;
                            break;
                        }
                        SignalBody::Join { .. } | SignalBody::Roster { .. } => {
                            debug!(
                                "Ignoring '{}' from joined member {}",
                                envelope.body.kind(),
                                user_id
                            );
                        }
                        body => {
                            self.route(&room_id, &user_id, envelope.to_user_id, body, envelope.ts);
                        }
                    }
                }
            }
        }

        if !left {
            self.detach(&room_id, &user_id, conn_id);
        }
    }

    fn attach(
        &self,
        room_id: &RoomId,
        participant: Participant,
        conn_id: u64,
        outbound: mpsc::UnboundedSender<Envelope>,
        kill: oneshot::Sender<()>,
    ) {
        let user_id = participant.user_id.clone();
        let mut room = self.inner.rooms.entry(room_id.clone()).or_default();

        // Replacing the entry drops the previous kill switch, which ends the older connection.
        let resumed = room
            .insert(
                user_id.clone(),
                Member {
                    participant: participant.clone(),
                    conn_id,
                    tx: Some(outbound.clone()),
                    kill: Some(kill),
                },
            )
            .is_some();

        let mut members: Vec<Participant> = room.values().map(|m| m.participant.clone()).collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let roster = Envelope::direct(
            room_id.clone(),
            UserId::from(RELAY_USER_ID),
            user_id.clone(),
            SignalBody::Roster { members },
        );
        let _ = outbound.send(roster);

        if resumed {
            info!("Member {} resumed in room {}", user_id, room_id);
            return;
        }

        info!("Member {} joined room {}", user_id, room_id);
        let join = Envelope::broadcast(
            room_id.clone(),
            user_id.clone(),
            SignalBody::Join { participant },
        );
        for (id, member) in room.iter() {
            if *id == user_id {
                continue;
            }
            if let Some(tx) = &member.tx {
                let _ = tx.send(join.clone());
            }
        }
    }

    fn route(
        &self,
        room_id: &RoomId,
        from: &UserId,
        to: Option<UserId>,
        body: SignalBody,
        ts: u64,
    ) {
        let Some(room) = self.inner.rooms.get(room_id) else {
            return;
        };

        let envelope = Envelope {
            room_id: room_id.clone(),
            from_user_id: from.clone(),
            to_user_id: to,
            body,
            ts: if ts == 0 { now_millis() } else { ts },
        };

        match &envelope.to_user_id {
            Some(target) => match room.get(target).and_then(|m| m.tx.as_ref()) {
                Some(tx) => {
                    let _ = tx.send(envelope);
                }
                None => debug!(
                    "Dropping '{}' from {} to absent member {}",
                    envelope.body.kind(),
                    from,
                    target
                ),
            },
            None => {
                for (id, member) in room.iter() {
                    if id == from {
                        continue;
                    }
                    if let Some(tx) = &member.tx {
                        let _ = tx.send(envelope.clone());
                    }
                }
            }
        }
    }

    /// Removes a member unless a newer connection has taken its place.
    fn leave(&self, room_id: &RoomId, user_id: &UserId, conn_id: u64) {
        if let Some(mut room) = self.inner.rooms.get_mut(room_id) {
            let current = room.get(user_id).is_some_and(|m| m.conn_id == conn_id);
            if !current {
                debug!(
                    "Ignoring leave of {} from superseded connection {}",
                    user_id, conn_id
                );
            } else if room.remove(user_id).is_some() {
                info!("Member {} left room {}", user_id, room_id);
                let leave =
                    Envelope::broadcast(room_id.clone(), user_id.clone(), SignalBody::Leave);
                for member in room.values() {
                    if let Some(tx) = &member.tx {
                        let _ = tx.send(leave.clone());
                    }
                }
            }
        }
        self.inner.rooms.remove_if(room_id, |_, members| members.is_empty());
    }

    /// Marks a member as dropped and starts its presence grace window.
    fn detach(&self, room_id: &RoomId, user_id: &UserId, conn_id: u64) {
        {
            let Some(mut room) = self.inner.rooms.get_mut(room_id) else {
                return;
            };
            let Some(member) = room.get_mut(user_id) else {
                return;
            };
            if member.conn_id != conn_id {
                return;
            }
            member.tx = None;
            member.kill = None;
        }

        let grace = self.inner.config.presence_grace;
        if grace.is_zero() {
            self.expire(room_id, user_id, conn_id);
            return;
        }

        debug!(
            "Member {} dropped from room {}, holding presence for {:?}",
            user_id, room_id, grace
        );
        let hub = self.clone();
        let room_id = room_id.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            hub.expire(&room_id, &user_id, conn_id);
        });
    }

    fn expire(&self, room_id: &RoomId, user_id: &UserId, conn_id: u64) {
        let still_dropped = self
            .inner
            .rooms
            .get(room_id)
            .and_then(|room| room.get(user_id).map(|m| m.conn_id == conn_id && m.tx.is_none()))
            .unwrap_or(false);

        if still_dropped {
            info!("Presence grace expired for {} in room {}", user_id, room_id);
            self.leave(room_id, user_id, conn_id);
        }
    }

    /// Forcibly closes a member's live connection. The member enters its grace window.
    pub fn disconnect(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let kill = self
            .inner
            .rooms
            .get_mut(room_id)
            .and_then(|mut room| room.get_mut(user_id).and_then(|m| m.kill.take()));

        match kill {
            Some(kill) => kill.send(()).is_ok(),
            None => false,
        }
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<Participant> {
        let mut members: Vec<Participant> = self
            .inner
            .rooms
            .get(room_id)
            .map(|room| room.values().map(|m| m.participant.clone()).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        members
    }

    pub fn is_connected(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.inner
            .rooms
            .get(room_id)
            .and_then(|room| room.get(user_id).map(|m| m.tx.is_some()))
            .unwrap_or(false)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
