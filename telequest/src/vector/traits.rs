use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EmbeddingVector, QueryResponse};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace vectors by key.
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()>;

    /// Nearest neighbours of `vector` among the vectors of `chat_id`, best first.
    async fn query(&self, chat_id: i64, vector: &[f32], top_k: usize) -> Result<QueryResponse>;
}
