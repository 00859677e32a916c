use crate::config::SignalingConfig;
use crate::error::SessionError;
use crate::signaling::ChannelEvent;
use convene_core::{
    BackoffPolicy, Envelope, Participant, RelayConnection, RelayError, RoomId, SignalBody,
    SignalingTransport, UserId,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

enum ChannelCommand {
    Send(Envelope),
    Leave(oneshot::Sender<()>),
}

/// Cloneable write side of a [`SignalingChannel`].
///
/// Envelopes sent while the relay is unreachable are queued and flushed after the next `join`.
#[derive(Clone)]
pub struct SignalingSender {
    room_id: RoomId,
    local: UserId,
    tx: mpsc::UnboundedSender<ChannelCommand>,
}

impl SignalingSender {
    pub fn local_user(&self) -> &UserId {
        &self.local
    }

    pub fn send(&self, envelope: Envelope) -> bool {
        self.tx.send(ChannelCommand::Send(envelope)).is_ok()
    }

    pub fn send_to(&self, to: &UserId, body: SignalBody) -> bool {
        self.send(Envelope::direct(
            self.room_id.clone(),
            self.local.clone(),
            to.clone(),
            body,
        ))
    }

    pub fn broadcast(&self, body: SignalBody) -> bool {
        self.send(Envelope::broadcast(
            self.room_id.clone(),
            self.local.clone(),
            body,
        ))
    }
}

/// Room-scoped publish/subscribe over a relay, with automatic reconnection.
pub struct SignalingChannel {
    sender: SignalingSender,
    task: JoinHandle<()>,
}

impl SignalingChannel {
    /// Connects, issues `join` and returns the channel with its event stream.
    ///
    /// Fails with `ChannelLost` when neither the first connect nor any scheduled retry succeeds.
    pub async fn join(
        transport: Arc<dyn SignalingTransport>,
        room_id: RoomId,
        participant: Participant,
        config: SignalingConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>), SessionError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let sender = SignalingSender {
            room_id: room_id.clone(),
            local: participant.user_id.clone(),
            tx: cmd_tx,
        };

        let mut actor = ChannelActor {
            transport,
            room_id,
            participant,
            policy: config.reconnect,
            cmd_rx,
            events: event_tx,
            pending: VecDeque::new(),
        };

        let connection = match actor.open().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Initial connect to room {} failed: {}", actor.room_id, e);
                match actor.reconnect().await {
                    Reconnect::Connected(connection) => connection,
                    Reconnect::Exhausted | Reconnect::Closed(_) => {
                        return Err(SessionError::ChannelLost {
                            attempts: actor.policy.max_attempts,
                        });
                    }
                }
            }
        };

        info!(
            "Joined room {} as {}",
            actor.room_id, actor.participant.user_id
        );
        let task = tokio::spawn(actor.run(connection));

        Ok((Self { sender, task }, event_rx))
    }

    pub fn sender(&self) -> SignalingSender {
        self.sender.clone()
    }

    pub fn send(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope)
    }

    /// Sends `leave` and closes the connection. Returns once the channel task has finished.
    pub async fn leave(self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.sender.tx.send(ChannelCommand::Leave(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
        let _ = self.task.await;
    }
}

enum Pump {
    Dropped,
    Closed(Option<oneshot::Sender<()>>),
}

enum Reconnect {
    Connected(RelayConnection),
    Exhausted,
    Closed(Option<oneshot::Sender<()>>),
}

struct ChannelActor {
    transport: Arc<dyn SignalingTransport>,
    room_id: RoomId,
    participant: Participant,
    policy: BackoffPolicy,
    cmd_rx: mpsc::UnboundedReceiver<ChannelCommand>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    pending: VecDeque<Envelope>,
}

impl ChannelActor {
    async fn run(mut self, mut connection: RelayConnection) {
        loop {
            match self.pump(&mut connection).await {
                Pump::Closed(reply) => {
                    debug!("Signaling channel for room {} closed", self.room_id);
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    return;
                }
                Pump::Dropped => {
                    warn!("Relay connection for room {} dropped", self.room_id);
                    let _ = self.events.send(ChannelEvent::Disconnected);

                    match self.reconnect().await {
                        Reconnect::Connected(next) => {
                            connection = next;
                            info!("Reconnected to room {}", self.room_id);
                            let _ = self.events.send(ChannelEvent::Reconnected);
                        }
                        Reconnect::Closed(reply) => {
                            if let Some(reply) = reply {
                                let _ = reply.send(());
                            }
                            return;
                        }
                        Reconnect::Exhausted => {
                            error!(
                                "Giving up on room {} after {} reconnection attempts",
                                self.room_id, self.policy.max_attempts
                            );
                            let _ = self.events.send(ChannelEvent::Lost {
                                attempts: self.policy.max_attempts,
                            });
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Moves envelopes both ways until the connection drops or the owner closes the channel.
    async fn pump(&mut self, connection: &mut RelayConnection) -> Pump {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ChannelCommand::Send(envelope)) => {
                        if let Err(unsent) = connection.outbound.send(envelope) {
                            self.pending.push_front(unsent.0);
                            return Pump::Dropped;
                        }
                    }
                    Some(ChannelCommand::Leave(reply)) => {
                        let _ = connection.outbound.send(self.leave_envelope());
                        return Pump::Closed(Some(reply));
                    }
                    None => {
                        let _ = connection.outbound.send(self.leave_envelope());
                        return Pump::Closed(None);
                    }
                },

                msg = connection.inbound.recv() => match msg {
                    Some(envelope) => {
                        let _ = self.events.send(ChannelEvent::Message(envelope));
                    }
                    None => return Pump::Dropped,
                },
            }
        }
    }

    /// Walks the backoff schedule. Outgoing envelopes are queued meanwhile.
    async fn reconnect(&mut self) -> Reconnect {
        let policy = self.policy;
        for (attempt, delay) in policy.delays().enumerate() {
            info!(
                "Reconnecting to room {} in {:?} (attempt {}/{})",
                self.room_id,
                delay,
                attempt + 1,
                policy.max_attempts
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(ChannelCommand::Send(envelope)) => self.pending.push_back(envelope),
                        Some(ChannelCommand::Leave(reply)) => return Reconnect::Closed(Some(reply)),
                        None => return Reconnect::Closed(None),
                    },
                }
            }

            match self.open().await {
                Ok(connection) => return Reconnect::Connected(connection),
                Err(e) => warn!("Reconnect to room {} failed: {}", self.room_id, e),
            }
        }

        Reconnect::Exhausted
    }

    /// Connects, re-issues `join` and flushes queued envelopes.
    async fn open(&mut self) -> Result<RelayConnection, RelayError> {
        let connection = self
            .transport
            .connect(&self.room_id, &self.participant)
            .await?;

        let join = Envelope::broadcast(
            self.room_id.clone(),
            self.participant.user_id.clone(),
            SignalBody::Join {
                participant: self.participant.clone(),
            },
        );
        connection
            .outbound
            .send(join)
            .map_err(|_| RelayError::Closed)?;

        if !self.pending.is_empty() {
            debug!(
                "Flushing {} queued envelopes to room {}",
                self.pending.len(),
                self.room_id
            );
        }
        while let Some(envelope) = self.pending.pop_front() {
            if let Err(unsent) = connection.outbound.send(envelope) {
                self.pending.push_front(unsent.0);
                return Err(RelayError::Closed);
            }
        }

        Ok(connection)
    }

    fn leave_envelope(&self) -> Envelope {
        Envelope::broadcast(
            self.room_id.clone(),
            self.participant.user_id.clone(),
            SignalBody::Leave,
        )
    }
}
