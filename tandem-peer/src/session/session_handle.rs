use crate::error::SessionError;
use crate::media::MediaTrack;
use crate::session::{CloseReason, SessionCommand};
use std::sync::Arc;
use tandem_core::{ParticipantId, SignalMessage};
use tokio::sync::{mpsc, watch};

/// Handle to a running session actor. Cheap to clone; the actor stops when it
/// is closed or every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) id: u64,
    pub(crate) remote: ParticipantId,
    pub(crate) command_tx: mpsc::UnboundedSender<SessionCommand>,
    pub(crate) close_tx: Arc<watch::Sender<Option<CloseReason>>>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    /// Передаёт offer, answer или кандидата от удалённого участника.
    pub fn signal(&self, msg: SignalMessage) -> Result<(), SessionError> {
        self.send(SessionCommand::Signal(msg))
    }

    pub fn start_negotiation(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::StartNegotiation)
    }

    pub fn add_track(&self, track: MediaTrack) -> Result<(), SessionError> {
        self.send(SessionCommand::AddTrack(track))
    }

    /// Реле не смогло доставить сообщение участнику.
    pub fn link_lost(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::LinkLost)
    }

    /// Cancels the adapter call in flight and drops queued commands. Only the
    /// first reason is kept.
    pub fn close(&self, reason: CloseReason) {
        self.close_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn is_closed(&self) -> bool {
        self.close_tx.borrow().is_some() || self.command_tx.is_closed()
    }

    fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        if self.close_tx.borrow().is_some() {
            return Err(SessionError::Closed);
        }
        self.command_tx.send(cmd).map_err(|_| SessionError::Closed)
    }
}
