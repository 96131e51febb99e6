use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router(state: &AppState) -> Router<AppState> {
    // Leave room above the upload limit so oversized exports get a proper message
    let history_limit = state.config.ingestion.history_max_bytes.saturating_mul(2);

    let chats = Router::new()
        .route("/{chatId}", get(handlers::chats::get_chat))
        .route("/{chatId}/messages", post(handlers::chats::record_message))
        .route(
            "/{chatId}/history",
            post(handlers::chats::ingest_history).layer(DefaultBodyLimit::max(history_limit)),
        )
        .route("/{chatId}/ask", post(handlers::chats::ask));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .nest("/chats", chats)
}
