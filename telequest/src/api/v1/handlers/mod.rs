pub mod chats;
pub(crate) mod health;

pub use health::health_check;
