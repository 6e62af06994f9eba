mod peer_session;
mod session_command;
mod session_config;
mod session_event;
mod session_handle;

pub use peer_session::*;
pub(crate) use session_command::*;
pub use session_config::*;
pub use session_event::*;
pub use session_handle::*;
