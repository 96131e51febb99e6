use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{ChatRepository, MessageRepository};
use crate::db::traits::MessageStore;
use crate::error::Result;
use crate::models::{ChatRecord, Message, WriteResult};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn try_store(&self, chat_id: i64, message: &Message) -> Result<bool> {
        let conn = self.db.connect()?;
        ChatRepository::ensure(&conn, chat_id, message.chat_title.as_deref()).await?;
        MessageRepository::insert_if_absent(&conn, chat_id, message).await
    }

    async fn try_store_many(&self, chat_id: i64, messages: &[Message]) -> Result<u64> {
        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        let group_name = messages.first().and_then(|m| m.chat_title.as_deref());
        ChatRepository::ensure(&tx, chat_id, group_name).await?;

        let mut inserted = 0;
        for message in messages {
            if MessageRepository::insert_if_absent(&tx, chat_id, message).await? {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl MessageStore for LibSqlBackend {
    async fn store(&self, chat_id: i64, message: &Message) -> WriteResult {
        match self.try_store(chat_id, message).await {
            Ok(true) => WriteResult::Success,
            Ok(false) => WriteResult::Existing,
            Err(e) => {
                tracing::error!(chat_id, message_id = message.id, error = %e, "Failed to store message");
                WriteResult::Failure
            }
        }
    }

    async fn store_many(&self, chat_id: i64, messages: &[Message]) -> WriteResult {
        match self.try_store_many(chat_id, messages).await {
            Ok(inserted) => {
                tracing::debug!(
                    chat_id,
                    inserted,
                    skipped = messages.len() as u64 - inserted,
                    "Stored message batch"
                );
                WriteResult::Success
            }
            Err(e) => {
                tracing::error!(chat_id, count = messages.len(), error = %e, "Failed to store messages");
                WriteResult::Failure
            }
        }
    }

    async fn lookup_by_ids(&self, chat_id: i64, message_ids: &[i64]) -> Result<Vec<Message>> {
        let conn = self.db.connect()?;
        MessageRepository::get_by_ids(&conn, chat_id, message_ids).await
    }

    async fn get_chat(&self, chat_id: i64) -> Result<Option<ChatRecord>> {
        let conn = self.db.connect()?;
        ChatRepository::get(&conn, chat_id).await
    }

    async fn count_messages(&self, chat_id: i64) -> Result<u64> {
        let conn = self.db.connect()?;
        MessageRepository::count_by_chat(&conn, chat_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
