mod error;
pub mod media;
pub mod monitor;
pub mod negotiation;
pub mod room;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use media::*;
pub use monitor::*;
pub use negotiation::*;
pub use room::*;
pub use session::*;
pub use transport::*;
