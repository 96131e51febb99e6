use serde::{Deserialize, Serialize};

/// Index key of a message vector: `"{chat_id}:{message_id}"`.
pub fn vector_key(chat_id: i64, message_id: i64) -> String {
    format!("{chat_id}:{message_id}")
}

/// Inverse of [`vector_key`].
pub fn parse_vector_key(key: &str) -> Option<(i64, i64)> {
    let (chat_id, message_id) = key.rsplit_once(':')?;
    Some((chat_id.parse().ok()?, message_id.parse().ok()?))
}

/// Embedding of one stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub key: String,
    pub values: Vec<f32>,
    pub chat_id: i64,
    pub message_id: i64,
}

impl EmbeddingVector {
    pub fn new(chat_id: i64, message_id: i64, values: Vec<f32>) -> Self {
        Self {
            key: vector_key(chat_id, message_id),
            values,
            chat_id,
            message_id,
        }
    }
}

/// A retrieved message id with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub message_id: i64,
    pub score: f32,
}

/// Candidates ordered by descending score.
pub type CandidateSet = Vec<Candidate>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VectorMetadata>,
}

/// Raw similarity query result as returned by an index backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<QueryMatch>,
    #[serde(default)]
    pub namespace: String,
}
