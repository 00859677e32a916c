use convene_core::Envelope;

/// What a [`SignalingChannel`](crate::signaling::SignalingChannel) reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(Envelope),

    /// The relay connection dropped; reconnection is in progress.
    Disconnected,

    /// A new relay connection is up and `join` was re-issued.
    Reconnected,

    /// The reconnection schedule ran out. The channel is gone.
    Lost { attempts: u32 },
}
