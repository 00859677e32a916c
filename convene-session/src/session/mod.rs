mod session_actor;
mod session_command;
mod session_coordinator;
mod session_event;
mod session_handle;
mod session_status;

pub use session_coordinator::*;
pub use session_event::*;
pub use session_handle::*;
pub use session_status::*;
