mod backoff;
mod media;
mod negotiation;
mod participant;
mod room;
mod signaling;

pub mod duration_ms;

pub use backoff::BackoffPolicy;
pub use media::MediaState;
pub use negotiation::{NegotiationId, NegotiationRole};
pub use participant::{Participant, RELAY_USER_ID, UserId};
pub use room::RoomId;
pub use signaling::{Envelope, IceCandidate, IceServerConfig, SignalBody, now_millis};
