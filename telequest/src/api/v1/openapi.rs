use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TeleQuest API",
        version = "1.0.0",
        description = "Question answering over Telegram group chat history.",
    ),
    paths(
        handlers::health::health_check,
        handlers::chats::get_chat,
        handlers::chats::record_message,
        handlers::chats::ingest_history,
        handlers::chats::ask,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        dto::messages::AuthorDto,
        dto::messages::RecordMessageRequest,
        dto::messages::RecordMessageResponse,
        dto::messages::WriteResultDto,
        dto::messages::IngestHistoryResponse,
        dto::answers::AskRequest,
        dto::answers::AskResponse,
        dto::answers::SourceMessage,
        dto::chats::ChatResponse,
        handlers::health::HealthData,
        handlers::health::ComponentStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "chats", description = "Message recording, history import and question answering"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
