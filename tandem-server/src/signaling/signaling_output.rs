use async_trait::async_trait;
use tandem_core::{ParticipantId, SignalError, SignalMessage};

/// Трейт, который должна реализовать внешняя система (WebSocket сервер),
/// чтобы комната могла доставлять сообщения участникам.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Отправить сообщение конкретному участнику.
    ///
    /// Возвращает `ParticipantUnreachable`, если у участника нет живого соединения.
    async fn deliver(
        &self,
        participant_id: &ParticipantId,
        msg: SignalMessage,
    ) -> Result<(), SignalError>;
}
