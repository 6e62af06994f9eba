use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("adapter call cancelled by close")]
    Cancelled,
    #[error("media adapter failed: {0}")]
    Adapter(String),
}
