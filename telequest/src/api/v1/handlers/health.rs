use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: ComponentStatus,
    pub embeddings: EmbeddingsStatus,
    pub vector_index: ComponentStatus,
    pub llm: LlmStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ComponentStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EmbeddingsStatus {
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn status(value: &str) -> ComponentStatus {
    ComponentStatus {
        status: value.to_string(),
    }
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let database = match state.store.ping().await {
        Ok(()) => status("ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            status("error")
        }
    };

    let vector_index = if state.index.is_available() {
        status("ok")
    } else {
        status("unavailable")
    };

    let llm = if state.llm.is_available() {
        LlmStatus {
            status: "available".to_string(),
            model: Some(state.llm.model().to_string()),
        }
    } else {
        LlmStatus {
            status: "unavailable".to_string(),
            model: None,
        }
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        embeddings: EmbeddingsStatus {
            model: state.config.embeddings.model.clone(),
            dimensions: state.config.embeddings.dimensions,
        },
        vector_index,
        llm,
    })
}
