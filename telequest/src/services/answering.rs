use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::MessageStore;
use crate::embeddings::EmbeddingGateway;
use crate::error::{Result, TelequestError};
use crate::llm::{AnswerGenerator, NO_ANSWER};
use crate::models::{EmbeddingVector, Message, WriteResult};
use crate::vector::VectorIndexClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Retrieved messages offered to the model, most relevant first.
    pub sources: Vec<Message>,
}

/// The live side of the pipeline: recording new messages and answering questions.
#[derive(Clone)]
pub struct AnsweringService {
    store: Arc<dyn MessageStore>,
    gateway: EmbeddingGateway,
    index: VectorIndexClient,
    generator: AnswerGenerator,
    top_k: usize,
    timeout: Duration,
}

impl AnsweringService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        gateway: EmbeddingGateway,
        index: VectorIndexClient,
        generator: AnswerGenerator,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            index,
            generator,
            top_k,
            timeout,
        }
    }

    /// Store `message` and index its text when it is new.
    ///
    /// Indexing failures are logged; the write result is returned regardless.
    pub async fn record_message(&self, chat_id: i64, message: &Message) -> WriteResult {
        let result = self.store.store(chat_id, message).await;

        if result == WriteResult::Success {
            if let Some(text) = message.embeddable_text() {
                if let Err(e) = self.index_message(chat_id, message.id, text).await {
                    tracing::warn!(chat_id, message_id = message.id, error = %e, "Failed to index message");
                }
            }
        }

        result
    }

    async fn index_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let values = self.gateway.embed_query(text).await?;
        self.index
            .upsert(&[EmbeddingVector::new(chat_id, message_id, values)])
            .await
    }

    /// Answer `question` from the messages of `chat_id`.
    ///
    /// Retrieval and the completion are each bounded by the answer timeout.
    /// Retrieval that runs out of time (e.g. a rate-limited embedding service)
    /// yields [`NO_ANSWER`] without asking the model.
    pub async fn answer(&self, chat_id: i64, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TelequestError::Validation(
                "Question cannot be empty".to_string(),
            ));
        }

        let retrieval = tokio::time::timeout(self.timeout, self.retrieve(chat_id, question)).await;
        let sources = match retrieval {
            Ok(sources) => sources?,
            Err(_) => {
                tracing::warn!(
                    chat_id,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Retrieval timed out"
                );
                return Ok(Answer {
                    answer: NO_ANSWER.to_string(),
                    sources: Vec::new(),
                });
            }
        };

        let texts: Vec<String> = sources
            .iter()
            .filter_map(|m| m.embeddable_text().map(str::to_string))
            .collect();

        let answer = self.generator.ask(question, &texts, self.timeout).await?;
        Ok(Answer { answer, sources })
    }

    /// Messages closest to `question`, most relevant first.
    async fn retrieve(&self, chat_id: i64, question: &str) -> Result<Vec<Message>> {
        let query = self.gateway.embed_query(question).await?;
        let candidates = self.index.query(chat_id, &query, self.top_k).await;

        let ids: Vec<i64> = candidates.iter().map(|c| c.message_id).collect();
        let mut found: HashMap<i64, Message> = self
            .store
            .lookup_by_ids(chat_id, &ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let sources: Vec<Message> = ids
            .iter()
            .filter_map(|id| found.remove(id))
            .filter(|m| m.embeddable_text().is_some())
            .collect();

        tracing::debug!(
            chat_id,
            candidates = candidates.len(),
            sources = sources.len(),
            "Retrieved context"
        );

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::GatewayConfig;
    use crate::llm::{AnswerGenerator, NO_ANSWER};
    use crate::test_support::{
        message, temp_store, CharTokenCounter, EchoEmbeddingService, InMemoryVectorIndex,
        ScriptedCompletion,
    };
    use pretty_assertions::assert_eq;

    struct Harness {
        service: AnsweringService,
        index: Arc<InMemoryVectorIndex>,
        embeddings: Arc<EchoEmbeddingService>,
        completion: Arc<ScriptedCompletion>,
        _dir: tempfile::TempDir,
    }

    async fn harness(completion: ScriptedCompletion) -> Harness {
        let (store, dir) = temp_store().await;
        let index = Arc::new(InMemoryVectorIndex::default());
        let embeddings = Arc::new(EchoEmbeddingService::default());
        let completion = Arc::new(completion);

        let service = AnsweringService::new(
            store,
            EmbeddingGateway::new(embeddings.clone(), GatewayConfig::default()),
            VectorIndexClient::new(index.clone()),
            AnswerGenerator::new(completion.clone(), Arc::new(CharTokenCounter), 10_000),
            2,
            Duration::from_secs(30),
        );

        Harness {
            service,
            index,
            embeddings,
            completion,
            _dir: dir,
        }
    }

    fn prompt_of(completion: &ScriptedCompletion) -> String {
        completion.calls()[0].0[1].content.clone()
    }

    #[tokio::test]
    async fn test_record_message_indexes_new_messages_only() {
        let h = harness(ScriptedCompletion::replying("unused")).await;

        let first = message(42, 1, "hello there");
        assert_eq!(h.service.record_message(42, &first).await, WriteResult::Success);
        assert_eq!(h.service.record_message(42, &first).await, WriteResult::Existing);

        assert_eq!(h.index.keys(), vec!["42:1".to_string()]);
        assert_eq!(h.embeddings.call_count(), 1);
    }

    #[tokio::test]
    async fn test_record_message_survives_index_failure() {
        let h = harness(ScriptedCompletion::replying("unused")).await;
        h.index.fail_upsert_call(0);

        let result = h.service.record_message(42, &message(42, 1, "hello")).await;
        assert_eq!(result, WriteResult::Success);
        assert_eq!(h.index.len(), 0);
    }

    #[tokio::test]
    async fn test_answer_uses_closest_messages_of_chat() {
        let h = harness(ScriptedCompletion::replying("On Friday.")).await;

        for (id, text) in [(1, "exam is on friday"), (2, "pizza tonight?"), (3, "bring a pencil")] {
            h.service.record_message(42, &message(42, id, text)).await;
        }
        h.service
            .record_message(7, &message(7, 9, "exam is on friday"))
            .await;

        let answer = h.service.answer(42, "exam is on friday").await.unwrap();

        assert_eq!(answer.answer, "On Friday.");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].id, 1);
        assert!(answer.sources.iter().all(|m| m.chat_id == 42));
        assert!(prompt_of(&h.completion).contains("exam is on friday"));
    }

    #[tokio::test]
    async fn test_answer_ignores_leaked_matches_from_other_chats() {
        let h = harness(ScriptedCompletion::replying("ok")).await;
        h.index.ignore_chat_filter();

        h.service
            .record_message(7, &message(7, 1, "secret from another chat"))
            .await;
        h.service.record_message(42, &message(42, 2, "our own note")).await;

        let answer = h.service.answer(42, "secret from another chat").await.unwrap();

        assert_eq!(answer.sources.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
        let prompt = prompt_of(&h.completion);
        assert!(!prompt.contains("\"\"\"\nsecret from another chat\n\"\"\""));
        assert!(prompt.contains("\"\"\"\nour own note\n\"\"\""));
    }

    #[tokio::test]
    async fn test_answer_without_candidates_still_asks() {
        let h = harness(ScriptedCompletion::replying(NO_ANSWER)).await;

        let answer = h.service.answer(42, "anyone there?").await.unwrap();

        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(h.completion.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_gives_up_when_retrieval_stalls() {
        let h = harness(ScriptedCompletion::replying("unused")).await;
        for _ in 0..1000 {
            h.embeddings
                .push_result(Err(TelequestError::RateLimited { retry_after: None }));
        }

        let answer = tokio::time::timeout(Duration::from_secs(3600), h.service.answer(42, "hello?"))
            .await
            .expect("answer must return within its own timeout")
            .unwrap();

        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(h.completion.calls().is_empty());
        assert!(h.embeddings.call_count() < 1000);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let h = harness(ScriptedCompletion::replying("unused")).await;

        let result = h.service.answer(42, "   ").await;
        assert!(matches!(result, Err(TelequestError::Validation(_))));
        assert_eq!(h.embeddings.call_count(), 0);
    }
}
