use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelequestError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Embedding input bounds were violated by the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The embedding service returned vectors out of input order.
    #[error("Embedding response out of order: position {position} carried index {index}")]
    OrderingViolation { position: usize, index: usize },

    /// An embedding batch does not line up with the messages that produced it.
    #[error("Embedding batch at offset {offset} has {vectors} vectors for {messages} messages")]
    Alignment {
        offset: usize,
        vectors: usize,
        messages: usize,
    },

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TelequestError>;
