pub mod answers;
pub mod chats;
pub mod messages;
