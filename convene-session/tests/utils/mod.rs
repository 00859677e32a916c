pub mod event_helpers;
pub mod mock_transport;
pub mod scripted_signaling;
pub mod test_room;

pub use event_helpers::*;
pub use mock_transport::*;
pub use scripted_signaling::*;
pub use test_room::*;
