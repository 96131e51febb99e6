//! # V1 API Response Envelope
//!
//! Every v1 endpoint returns an [`ApiResponse<T>`]:
//!
//! ```json
//! {
//!   "data": { ... },
//!   "error": { "code": "not_found", "message": "..." }
//! }
//! ```
//!
//! `data` is present on success and `error` on failure, never both.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::TelequestError;

/// Machine-readable error code, serialized as snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request or failed validation. HTTP 400.
    InvalidRequest,
    /// Upstream credentials were rejected. HTTP 401.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// Upstream rate limit. HTTP 429.
    RateLimited,
    /// Internal details are never leaked. HTTP 500.
    InternalError,
    /// A required backend is not configured. HTTP 503.
    Unavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Structured error payload within the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::CREATED,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<TelequestError> for ApiResponse<T> {
    /// Internal failures are logged and reported with a generic message.
    fn from(err: TelequestError) -> Self {
        match err {
            TelequestError::NotFound(ref msg) => ApiResponse::error(ErrorCode::NotFound, msg.clone()),

            TelequestError::Validation(ref msg) | TelequestError::InvalidInput(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            TelequestError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            TelequestError::ApiAuth(ref detail) => {
                tracing::error!(detail = %detail, "Upstream service rejected credentials");
                ApiResponse::error(ErrorCode::Unauthorized, "Upstream authentication failed")
            }

            TelequestError::RateLimited { retry_after } => {
                let msg = match retry_after {
                    Some(secs) => format!("Rate limit exceeded, retry after {secs} seconds"),
                    None => "Rate limit exceeded".to_string(),
                };
                ApiResponse::error(ErrorCode::RateLimited, msg)
            }

            TelequestError::LlmUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::Unavailable, msg.clone())
            }

            ref internal @ (TelequestError::Database(_)
            | TelequestError::Embedding(_)
            | TelequestError::OrderingViolation { .. }
            | TelequestError::Alignment { .. }
            | TelequestError::VectorIndex(_)
            | TelequestError::Http(_)
            | TelequestError::Io(_)
            | TelequestError::Llm(_)
            | TelequestError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
