use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChatRecord, Message, WriteResult};

/// Idempotent persistence of chat messages keyed by `(chat_id, message_id)`.
///
/// Write operations never return errors: backend failures surface as
/// [`WriteResult::Failure`] so bulk flows can keep going.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Attach one message to its chat, creating the chat on first write.
    async fn store(&self, chat_id: i64, message: &Message) -> WriteResult;

    /// Attach many messages at once, skipping ids the chat already holds.
    ///
    /// `Success` only means the batch was applied; it does not tell whether
    /// some of the messages were already present.
    async fn store_many(&self, chat_id: i64, messages: &[Message]) -> WriteResult;

    /// Messages of `chat_id` whose ids are in `message_ids`. Unknown ids are skipped.
    async fn lookup_by_ids(&self, chat_id: i64, message_ids: &[i64]) -> Result<Vec<Message>>;

    async fn get_chat(&self, chat_id: i64) -> Result<Option<ChatRecord>>;

    async fn count_messages(&self, chat_id: i64) -> Result<u64>;

    /// Fails when the backend cannot answer a trivial query.
    async fn ping(&self) -> Result<()>;
}
