mod memory_transport;
mod ws_handler;

pub use memory_transport::*;
pub use ws_handler::*;
