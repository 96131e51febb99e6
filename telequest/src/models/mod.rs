mod export;
mod message;
mod vector;

pub use export::*;
pub use message::*;
pub use vector::*;
