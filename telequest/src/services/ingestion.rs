use std::sync::Arc;

use futures::{pin_mut, StreamExt};
use serde::{Deserialize, Serialize};

use crate::db::MessageStore;
use crate::embeddings::{EmbeddedBatch, EmbeddingGateway};
use crate::error::{Result, TelequestError};
use crate::models::{ChatExport, EmbeddingVector, Message, RawMessage, WriteResult};
use crate::vector::VectorIndexClient;

/// Summary of one history import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Messages handed to the store. Already-present ids are included.
    pub stored_count: usize,
    pub discarded_count: usize,
    pub store_result: WriteResult,
    pub vector_batches_attempted: usize,
    /// Indices of the upsert batches that failed, counted across the whole import.
    pub vector_batches_failed: Vec<usize>,
    /// Set when embedding stopped the import early. Stored messages are kept.
    pub embedding_error: Option<String>,
}

#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn MessageStore>,
    gateway: EmbeddingGateway,
    index: VectorIndexClient,
    max_window: usize,
    upsert_batch_size: usize,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        gateway: EmbeddingGateway,
        index: VectorIndexClient,
        max_window: usize,
        upsert_batch_size: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            index,
            max_window,
            upsert_batch_size,
        }
    }

    pub async fn ingest_export(&self, chat_id: i64, export: ChatExport) -> Result<IngestReport> {
        self.ingest_history(chat_id, export.name.as_deref(), export.messages)
            .await
    }

    /// Store a chat's history and index the text of its most recent messages.
    ///
    /// Failed vector batches are reported, not retried, and never undo the
    /// stored messages.
    pub async fn ingest_history(
        &self,
        chat_id: i64,
        chat_title: Option<&str>,
        raw_messages: Vec<RawMessage>,
    ) -> Result<IngestReport> {
        let total = raw_messages.len();
        let mut messages = Vec::with_capacity(total);
        for raw in raw_messages {
            let raw_id = raw.id;
            match raw.into_message(chat_id, chat_title) {
                Ok(message) => messages.push(message),
                Err(reason) => tracing::debug!(chat_id, message_id = raw_id, ?reason, "Discarding message"),
            }
        }
        let discarded_count = total - messages.len();

        let store_result = self.store.store_many(chat_id, &messages).await;
        let mut report = IngestReport {
            stored_count: if store_result.is_failure() { 0 } else { messages.len() },
            discarded_count,
            store_result,
            vector_batches_attempted: 0,
            vector_batches_failed: Vec::new(),
            embedding_error: None,
        };

        if store_result.is_failure() {
            tracing::error!(chat_id, "History not stored, skipping indexing");
            return Ok(report);
        }

        let embeddable: Vec<&Message> = messages
            .iter()
            .filter(|m| m.embeddable_text().is_some())
            .collect();
        if embeddable.is_empty() {
            return Ok(report);
        }

        let texts: Vec<String> = embeddable
            .iter()
            .filter_map(|m| m.embeddable_text().map(str::to_string))
            .collect();

        let batches = self.gateway.batch_embed(texts, self.max_window);
        pin_mut!(batches);

        let mut embedded_batches: usize = 0;
        while let Some(batch) = batches.next().await {
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(chat_id, embedded_batches, error = %e, "Embedding failed, indexing stopped");
                    report.embedding_error = Some(format!(
                        "Embedding failed after {embedded_batches} batches; stored messages were kept"
                    ));
                    break;
                }
            };
            embedded_batches += 1;

            let vectors = vectors_for_batch(chat_id, batch, &embeddable)?;
            let upserted = self
                .index
                .upsert_batched(&vectors, self.upsert_batch_size)
                .await?;

            let base = report.vector_batches_attempted;
            report
                .vector_batches_failed
                .extend(upserted.failed.iter().map(|i| base + i));
            report.vector_batches_attempted += upserted.attempted;
        }

        tracing::info!(
            chat_id,
            stored = report.stored_count,
            discarded = report.discarded_count,
            vector_batches = report.vector_batches_attempted,
            failed_batches = report.vector_batches_failed.len(),
            "History ingested"
        );

        Ok(report)
    }
}

/// Pair a batch's vectors with the messages at `[offset, offset + len)`.
fn vectors_for_batch(
    chat_id: i64,
    batch: EmbeddedBatch,
    messages: &[&Message],
) -> Result<Vec<EmbeddingVector>> {
    let available = messages.len().saturating_sub(batch.offset);
    if batch.offset > messages.len() || batch.vectors.len() > available {
        return Err(TelequestError::Alignment {
            offset: batch.offset,
            vectors: batch.vectors.len(),
            messages: available,
        });
    }

    Ok(messages[batch.offset..]
        .iter()
        .zip(batch.vectors)
        .map(|(message, values)| EmbeddingVector::new(chat_id, message.id, values))
        .collect())
}
