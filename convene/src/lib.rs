pub use convene_core::model::{Participant, RoomId, UserId};

pub mod model {
    pub use convene_core::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use convene_session::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use convene_relay::*;
}
