mod relay_connector;
mod webrtc_adapter;

pub use relay_connector::*;
pub use webrtc_adapter::*;
