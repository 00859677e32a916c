mod media_devices;
mod media_track;
mod remote_track;

pub use media_devices::*;
pub use media_track::*;
pub use remote_track::*;
