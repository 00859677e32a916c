mod relay_config;
mod relay_hub;

pub use relay_config::*;
pub use relay_hub::*;
