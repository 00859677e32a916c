pub mod model;
pub mod traits;

pub use model::*;
pub use traits::*;
