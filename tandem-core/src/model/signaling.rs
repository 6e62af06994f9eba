use crate::model::ice::IceCandidate;
use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            credential: None,
        }
    }
}

/// Причина, по которой ретранслятор не смог обработать сообщение.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Адресат не состоит в комнате или его соединение уже закрыто.
    ParticipantUnreachable,
    /// Отправитель ещё не вошёл ни в одну комнату.
    NotInRoom,
}

/// Сообщения сигнального канала между участником и ретранслятором.
///
/// `from_participant_id` проставляет ретранслятор при пересылке;
/// значение, присланное клиентом, перезаписывается.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    JoinRoom {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    RoomJoined {
        room_id: RoomId,
        participants: Vec<ParticipantId>,
    },
    UserJoined {
        participant_id: ParticipantId,
    },
    #[serde(rename = "call-user")]
    Offer {
        to_participant_id: ParticipantId,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
    },
    #[serde(rename = "call-accepted")]
    Answer {
        to_participant_id: ParticipantId,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
    },
    IceCandidate {
        to_participant_id: ParticipantId,
        candidate: IceCandidate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
    },
    Leave {
        participant_id: ParticipantId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_participant_id: Option<ParticipantId>,
    },
}

impl SignalMessage {
    /// Wire tag, handy for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::JoinRoom { .. } => "join-room",
            SignalMessage::RoomJoined { .. } => "room-joined",
            SignalMessage::UserJoined { .. } => "user-joined",
            SignalMessage::Offer { .. } => "call-user",
            SignalMessage::Answer { .. } => "call-accepted",
            SignalMessage::IceCandidate { .. } => "ice-candidate",
            SignalMessage::Leave { .. } => "leave",
            SignalMessage::IceConfig { .. } => "ice-config",
            SignalMessage::Error { .. } => "error",
        }
    }

    /// Адресат для сообщений, которые ретранслятор пересылает одному участнику.
    pub fn recipient(&self) -> Option<&ParticipantId> {
        match self {
            SignalMessage::Offer {
                to_participant_id, ..
            }
            | SignalMessage::Answer {
                to_participant_id, ..
            }
            | SignalMessage::IceCandidate {
                to_participant_id, ..
            } => Some(to_participant_id),
            _ => None,
        }
    }

    pub fn sender(&self) -> Option<&ParticipantId> {
        match self {
            SignalMessage::Offer {
                from_participant_id,
                ..
            }
            | SignalMessage::Answer {
                from_participant_id,
                ..
            }
            | SignalMessage::IceCandidate {
                from_participant_id,
                ..
            } => from_participant_id.as_ref(),
            _ => None,
        }
    }

    pub fn is_routable(&self) -> bool {
        self.recipient().is_some()
    }

    /// Returns the message with the sender stamped in. Non-routable messages
    /// are returned untouched.
    pub fn with_sender(mut self, from: ParticipantId) -> Self {
        match &mut self {
            SignalMessage::Offer {
                from_participant_id,
                ..
            }
            | SignalMessage::Answer {
                from_participant_id,
                ..
            }
            | SignalMessage::IceCandidate {
                from_participant_id,
                ..
            } => *from_participant_id = Some(from),
            _ => {}
        }
        self
    }
}
