mod ice;
mod participant;
mod room;
mod signaling;

pub use ice::IceCandidate;
pub use participant::ParticipantId;
pub use room::RoomId;
pub use signaling::{ErrorCode, IceServerConfig, SignalMessage};
