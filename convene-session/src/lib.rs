pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod presence;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use error::*;
pub use media::*;
pub use peer::*;
pub use presence::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
