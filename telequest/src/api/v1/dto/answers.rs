use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Message;
use crate::services::Answer;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AskRequest {
    pub question: String,
}

/// A message the answer was drawn from.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceMessage {
    pub message_id: i64,
    pub author_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub date: DateTime<Utc>,
    pub text: String,
}

impl From<Message> for SourceMessage {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            author_id: message.from_user.id,
            author_name: message.from_user.name,
            date: message.date,
            text: message.text.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourceMessage>,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.answer,
            sources: answer.sources.into_iter().map(Into::into).collect(),
        }
    }
}
