
pub use mock_media_adapter::*;
pub use relay::*;
