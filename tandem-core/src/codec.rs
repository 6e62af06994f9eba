use crate::error::CodecError;
use crate::model::SignalMessage;

pub fn encode(msg: &SignalMessage) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(CodecError::Encode)
}

/// Parses one text frame. Identifiers must be non-empty.
pub fn decode(text: &str) -> Result<SignalMessage, CodecError> {
    let msg: SignalMessage =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;
    validate(&msg)?;
    Ok(msg)
}

fn validate(msg: &SignalMessage) -> Result<(), CodecError> {
    let empty = match msg {
        SignalMessage::JoinRoom {
            room_id,
            participant_id,
        } => room_id.is_empty() || participant_id.is_empty(),
        SignalMessage::RoomJoined { room_id, .. } => room_id.is_empty(),
        SignalMessage::UserJoined { participant_id } | SignalMessage::Leave { participant_id } => {
            participant_id.is_empty()
        }
        SignalMessage::Offer {
            to_participant_id, ..
        }
        | SignalMessage::Answer {
            to_participant_id, ..
        }
        | SignalMessage::IceCandidate {
            to_participant_id, ..
        } => to_participant_id.is_empty(),
        SignalMessage::IceConfig { .. } | SignalMessage::Error { .. } => false,
    };

    if empty {
        return Err(CodecError::Malformed(format!(
            "empty identifier in '{}'",
            msg.kind()
        )));
    }
    Ok(())
}
