use tandem_core::{ParticipantId, SignalError, SignalMessage};
use tokio::sync::oneshot;

/// Команды, поступающие в актор комнаты от сигнального сервера.
#[derive(Debug)]
pub enum RoomCommand {
    /// Участник входит в комнату; в ответ приходит список тех, кто уже внутри.
    Join {
        participant_id: ParticipantId,
        reply: oneshot::Sender<Vec<ParticipantId>>,
    },

    /// Переслать offer/answer/ICE другому участнику этой же комнаты.
    Route {
        from: ParticipantId,
        message: SignalMessage,
        reply: oneshot::Sender<Result<(), SignalError>>,
    },

    /// Участник покидает комнату (явный leave или разрыв WebSocket).
    Leave {
        participant_id: ParticipantId,
        reply: oneshot::Sender<()>,
    },

    /// Текущий состав комнаты.
    Members {
        reply: oneshot::Sender<Vec<ParticipantId>>,
    },
}
