mod connection_state;
mod ice_buffer;
mod link_command;
mod link_event;
mod peer_link;
mod peer_link_handle;

pub use connection_state::*;
pub use ice_buffer::*;
pub use link_command::*;
pub use link_event::*;
pub use peer_link::*;
pub use peer_link_handle::*;
