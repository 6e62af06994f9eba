use crate::media::RemoteTrack;
use crate::monitor::LinkState;
use crate::negotiation::NegotiationState;
use std::fmt;
use tandem_core::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    PeerLeft,
    LocalClose,
    AdapterFailure(String),
    ConnectionTimeout,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerLeft => f.write_str("peer left"),
            CloseReason::LocalClose => f.write_str("closed locally"),
            CloseReason::AdapterFailure(e) => write!(f, "media adapter failure: {e}"),
            CloseReason::ConnectionTimeout => f.write_str("connection timed out"),
        }
    }
}

/// Events a session reports to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        peer: ParticipantId,
        state: NegotiationState,
    },
    LinkChanged {
        peer: ParticipantId,
        state: LinkState,
    },
    TrackReceived {
        peer: ParticipantId,
        track: RemoteTrack,
    },
    /// Последнее событие сессии, приходит ровно один раз.
    Closed {
        peer: ParticipantId,
        session_id: u64,
        reason: CloseReason,
    },
}

impl SessionEvent {
    pub fn peer(&self) -> &ParticipantId {
        match self {
            SessionEvent::StateChanged { peer, .. }
            | SessionEvent::LinkChanged { peer, .. }
            | SessionEvent::TrackReceived { peer, .. }
            | SessionEvent::Closed { peer, .. } => peer,
        }
    }
}
