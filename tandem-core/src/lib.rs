pub mod codec;
pub mod error;
pub mod model;
pub mod utils;

pub use codec::{decode, encode};
pub use error::{CodecError, SignalError};
pub use model::*;
