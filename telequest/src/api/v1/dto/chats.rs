use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChatRecord;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub categories: Vec<String>,
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<ChatRecord> for ChatResponse {
    fn from(chat: ChatRecord) -> Self {
        Self {
            chat_id: chat.chat_id,
            group_name: chat.group_name,
            categories: chat.categories,
            message_count: chat.message_count,
            created_at: chat.created_at,
        }
    }
}
