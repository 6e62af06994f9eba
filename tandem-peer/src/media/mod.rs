mod adapter;
mod description;
mod track;

pub use adapter::*;
pub use description::*;
pub use track::*;
