use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a message author at the time the message was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: Option<String>,
    pub is_bot: bool,
}

/// A conversation message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub from_user: Author,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub reply_to_message: Option<i64>,
    pub chat_title: Option<String>,
}

impl Message {
    /// Text worth embedding. Messages without text (stickers, photos, ...) have none.
    pub fn embeddable_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub group_name: Option<String>,
    pub categories: Vec<String>,
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a message write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    /// The message was newly attached to its chat.
    Success,
    /// The chat already holds a message with this id; nothing changed.
    Existing,
    /// The backend rejected the write.
    Failure,
}

impl WriteResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, WriteResult::Failure)
    }
}
