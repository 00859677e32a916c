pub mod hub;
pub mod transport;

pub use hub::*;
pub use transport::*;
