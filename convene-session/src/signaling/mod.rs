mod channel_event;
mod signaling_channel;
mod ws_transport;

pub use channel_event::*;
pub use signaling_channel::*;
pub use ws_transport::*;
