mod app_state;
mod room;
mod signaling;

pub use app_state::*;
pub use room::*;
pub use signaling::*;
