pub use tandem_core::{ParticipantId, RoomId, SignalMessage};

pub mod model {
    pub use tandem_core::model::*;
}

pub mod codec {
    pub use tandem_core::codec::*;
    pub use tandem_core::{CodecError, SignalError};
}

#[cfg(feature = "server")]
pub mod server {
    pub use tandem_server::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use tandem_peer::*;
}
