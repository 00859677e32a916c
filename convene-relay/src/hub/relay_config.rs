use std::time::Duration;

/// Relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a dropped member stays in the roster before `leave` is announced.
    pub presence_grace: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            presence_grace: Duration::from_secs(10),
        }
    }
}
