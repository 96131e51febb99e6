use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Author, Message, WriteResult};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// A live message as delivered by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMessageRequest {
    pub message_id: i64,
    pub from: AuthorDto,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub chat_title: Option<String>,
}

impl RecordMessageRequest {
    pub fn into_message(self, chat_id: i64) -> Message {
        Message {
            id: self.message_id,
            chat_id,
            from_user: Author {
                id: self.from.id,
                name: self.from.name,
                is_bot: self.from.is_bot,
            },
            date: self.date,
            text: self.text,
            reply_to_message: self.reply_to_message_id,
            chat_title: self.chat_title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WriteResultDto {
    Success,
    Existing,
    Failure,
}

impl From<WriteResult> for WriteResultDto {
    fn from(result: WriteResult) -> Self {
        match result {
            WriteResult::Success => Self::Success,
            WriteResult::Existing => Self::Existing,
            WriteResult::Failure => Self::Failure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMessageResponse {
    pub message_id: i64,
    pub result: WriteResultDto,
}

/// Outcome of a history upload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestHistoryResponse {
    pub stored_count: usize,
    pub discarded_count: usize,
    pub store_result: WriteResultDto,
    pub vector_batches_attempted: usize,
    pub vector_batches_failed: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
}

impl From<crate::services::IngestReport> for IngestHistoryResponse {
    fn from(report: crate::services::IngestReport) -> Self {
        Self {
            stored_count: report.stored_count,
            discarded_count: report.discarded_count,
            store_result: report.store_result.into(),
            vector_batches_attempted: report.vector_batches_attempted,
            vector_batches_failed: report.vector_batches_failed,
            embedding_error: report.embedding_error,
        }
    }
}
