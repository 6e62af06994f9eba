mod controller;
mod ice_buffer;
mod negotiation_state;

pub use controller::*;
pub use ice_buffer::*;
pub use negotiation_state::*;
