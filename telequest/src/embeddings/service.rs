use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Remote text-embedding service.
///
/// Implementations perform exactly one request per call and report throttling
/// as [`crate::error::TelequestError::RateLimited`] so callers can back off.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn create_embeddings(&self, input: &[String]) -> Result<EmbeddingResponse>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<IndexedEmbedding>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: Option<EmbeddingUsage>,
}

/// A vector tagged with the position of the input it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEmbedding {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
