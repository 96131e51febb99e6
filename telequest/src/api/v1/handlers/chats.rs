use axum::body::Bytes;
use axum::extract::{Path, State};

use crate::api::v1::dto::answers::{AskRequest, AskResponse};
use crate::api::v1::dto::chats::ChatResponse;
use crate::api::v1::dto::messages::{
    IngestHistoryResponse, RecordMessageRequest, RecordMessageResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::llm::NO_ANSWER;
use crate::models::{ChatExport, WriteResult};

/// `GET /api/v1/chats/{chatId}`
#[utoipa::path(
    get,
    path = "/api/v1/chats/{chatId}",
    tag = "chats",
    operation_id = "chats.get",
    params(("chatId" = i64, Path, description = "Chat ID")),
    responses(
        (status = 200, description = "Chat found", body = ChatResponse),
        (status = 404, description = "Chat not found", body = ApiError),
    )
)]
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> ApiResponse<ChatResponse> {
    match state.store.get_chat(chat_id).await {
        Ok(Some(chat)) => ApiResponse::success(chat.into()),
        Ok(None) => ApiResponse::error(ErrorCode::NotFound, format!("Chat {chat_id} not found")),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/chats/{chatId}/messages`
///
/// Stores one live message and indexes it when it is new.
#[utoipa::path(
    post,
    path = "/api/v1/chats/{chatId}/messages",
    tag = "chats",
    operation_id = "chats.messages.record",
    params(("chatId" = i64, Path, description = "Chat ID")),
    request_body = RecordMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = RecordMessageResponse),
        (status = 200, description = "Message already stored", body = RecordMessageResponse),
        (status = 500, description = "Message could not be stored", body = ApiError),
    )
)]
pub async fn record_message(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    axum::Json(req): axum::Json<RecordMessageRequest>,
) -> ApiResponse<RecordMessageResponse> {
    let message = req.into_message(chat_id);
    let message_id = message.id;

    let result = state.answering.record_message(chat_id, &message).await;
    let response = RecordMessageResponse {
        message_id,
        result: result.into(),
    };

    match result {
        WriteResult::Success => ApiResponse::created(response),
        WriteResult::Existing => ApiResponse::success(response),
        WriteResult::Failure => {
            ApiResponse::error(ErrorCode::InternalError, "The message could not be stored")
        }
    }
}

/// `POST /api/v1/chats/{chatId}/history`
///
/// Body is a chat export (`result.json`).
#[utoipa::path(
    post,
    path = "/api/v1/chats/{chatId}/history",
    tag = "chats",
    operation_id = "chats.history.ingest",
    params(("chatId" = i64, Path, description = "Chat ID")),
    request_body(content = String, content_type = "application/json", description = "Chat export JSON"),
    responses(
        (status = 200, description = "History ingested", body = IngestHistoryResponse),
        (status = 400, description = "Upload too big, invalid or empty", body = ApiError),
    )
)]
pub async fn ingest_history(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    body: Bytes,
) -> ApiResponse<IngestHistoryResponse> {
    let export = match ChatExport::from_slice(&body, state.config.ingestion.history_max_bytes) {
        Ok(export) => export,
        Err(e) => return e.into(),
    };

    match state.ingestion.ingest_export(chat_id, export).await {
        Ok(report) => ApiResponse::success(report.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/chats/{chatId}/ask`
///
/// Failures while answering are reported as the no-answer reply.
#[utoipa::path(
    post,
    path = "/api/v1/chats/{chatId}/ask",
    tag = "chats",
    operation_id = "chats.ask",
    params(("chatId" = i64, Path, description = "Chat ID")),
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer", body = AskResponse),
        (status = 400, description = "Empty question", body = ApiError),
    )
)]
pub async fn ask(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    axum::Json(req): axum::Json<AskRequest>,
) -> ApiResponse<AskResponse> {
    if req.question.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Question cannot be empty");
    }

    match state.answering.answer(chat_id, &req.question).await {
        Ok(answer) => ApiResponse::success(answer.into()),
        Err(e) => {
            tracing::error!(chat_id, error = %e, "Failed to answer question");
            ApiResponse::success(AskResponse {
                answer: NO_ANSWER.to_string(),
                sources: Vec::new(),
            })
        }
    }
}
