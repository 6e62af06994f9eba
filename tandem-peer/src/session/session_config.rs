use std::time::Duration;

pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Сколько ждать восстановления связи, прежде чем закрыть сессию.
    pub disconnect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}
