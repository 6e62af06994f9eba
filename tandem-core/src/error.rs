use crate::model::ParticipantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Входящий текст не является корректным сигнальным сообщением.
    #[error("malformed signal message: {0}")]
    Malformed(String),

    #[error("failed to encode signal message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Ошибки маршрутизации на ретрансляторе.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("participant {0} is unreachable")]
    ParticipantUnreachable(ParticipantId),

    #[error("participant is not in a room")]
    NotInRoom,

    #[error("message type '{0}' cannot be routed")]
    NotRoutable(&'static str),
}
