use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::batch;
use crate::error::{Result, TelequestError};
use crate::models::{parse_vector_key, Candidate, CandidateSet, EmbeddingVector, QueryMatch};

use super::traits::VectorIndex;

/// Outcome of a batched upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub attempted: usize,
    /// Indices of the batches that failed.
    pub failed: Vec<usize>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Front for the similarity index. An unconfigured index answers every query
/// with no candidates.
#[derive(Clone)]
pub struct VectorIndexClient {
    index: Option<Arc<dyn VectorIndex>>,
}

impl VectorIndexClient {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index: Some(index) }
    }

    pub fn unavailable() -> Self {
        Self { index: None }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    pub async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| TelequestError::VectorIndex("index is not initialized".to_string()))?;
        index.upsert(vectors).await
    }

    /// Upsert in batches of `batch_size`. A failing batch does not stop the others.
    pub async fn upsert_batched(
        &self,
        vectors: &[EmbeddingVector],
        batch_size: usize,
    ) -> Result<UpsertReport> {
        let batches = batch::split(vectors, batch_size)?;
        let mut report = UpsertReport::default();

        for (i, batch) in batches.iter().enumerate() {
            report.attempted += 1;
            if let Err(e) = self.upsert(batch).await {
                tracing::warn!(batch = i, size = batch.len(), error = %e, "Vector batch upsert failed");
                report.failed.push(i);
            }
        }

        Ok(report)
    }

    /// Up to `top_k` candidates of `chat_id`, best first. Errors yield no candidates.
    pub async fn query(&self, chat_id: i64, vector: &[f32], top_k: usize) -> CandidateSet {
        let Some(ref index) = self.index else {
            tracing::debug!(chat_id, "Vector index unavailable, no candidates");
            return Vec::new();
        };

        let response = match index.query(chat_id, vector, top_k).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Vector query failed");
                return Vec::new();
            }
        };

        let mut candidates: CandidateSet = response
            .matches
            .iter()
            .filter_map(|m| candidate_for_chat(m, chat_id))
            .collect();

        // Stable, so equal scores keep the index's order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(top_k);
        candidates
    }
}

fn candidate_for_chat(m: &QueryMatch, chat_id: i64) -> Option<Candidate> {
    let parsed = parse_vector_key(&m.id);

    let (match_chat, message_id) = match (&m.metadata, parsed) {
        (Some(meta), parsed) => (
            meta.chat_id,
            meta.message_id.or(parsed.map(|(_, message_id)| message_id))?,
        ),
        (None, Some(parsed)) => parsed,
        (None, None) => return None,
    };

    if match_chat != chat_id {
        tracing::warn!(chat_id, match_chat, id = %m.id, "Dropping match from another chat");
        return None;
    }

    Some(Candidate {
        message_id,
        score: m.score,
    })
}
