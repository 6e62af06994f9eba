pub mod mock_signaling;
pub mod relay_client;

pub use mock_signaling::*;
pub use relay_client::*;
