use crate::media::MediaTrack;
use tandem_core::SignalMessage;

/// Команды от `SessionHandle` к актору сессии. Закрытие идёт отдельно, через
/// watch-канал, чтобы обогнать очередь.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Signal(SignalMessage),
    StartNegotiation,
    AddTrack(MediaTrack),
    LinkLost,
}
