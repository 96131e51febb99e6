//! In-process stand-ins for the external services, shared by unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::context::TokenCounter;
use crate::db::{Database, LibSqlBackend};
use crate::embeddings::{EmbeddingResponse, EmbeddingService, IndexedEmbedding};
use crate::error::{Result, TelequestError};
use crate::llm::{ChatMessage, CompletionService};
use crate::models::{Author, EmbeddingVector, Message, QueryMatch, QueryResponse, VectorMetadata};
use crate::vector::VectorIndex;

/// Message store on a fresh database file. Keep the directory alive for the test.
pub async fn temp_store() -> (Arc<LibSqlBackend>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(&DatabaseConfig {
        url: format!("file:{}", dir.path().join("telequest.db").display()),
        auth_token: None,
        local_path: None,
    })
    .await
    .unwrap();
    (Arc::new(LibSqlBackend::new(db)), dir)
}

/// A text message from "Ada" in the "Study group" chat.
pub fn message(chat_id: i64, id: i64, text: &str) -> Message {
    Message {
        id,
        chat_id,
        from_user: Author {
            id: 7,
            name: Some("Ada".to_string()),
            is_bot: false,
        },
        date: Utc
            .with_ymd_and_hms(2023, 4, 1, 10, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(id),
        text: Some(text.to_string()),
        reply_to_message: None,
        chat_title: Some("Study group".to_string()),
    }
}

/// Embeds every text into a deterministic 3-dimensional vector.
/// Queued results replace the echo for the next calls.
#[derive(Default)]
pub struct EchoEmbeddingService {
    scripted: Mutex<VecDeque<Result<EmbeddingResponse>>>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl EchoEmbeddingService {
    pub fn vector_for(text: &str) -> Vec<f32> {
        let byte_sum: u32 = text.bytes().map(u32::from).sum();
        vec![text.len() as f32, (byte_sum % 101) as f32, 1.0]
    }

    pub fn push_result(&self, result: Result<EmbeddingResponse>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingService for EchoEmbeddingService {
    async fn create_embeddings(&self, input: &[String]) -> Result<EmbeddingResponse> {
        self.requests.lock().unwrap().push(input.to_vec());

        if let Some(result) = self.scripted.lock().unwrap().pop_front() {
            return result;
        }

        Ok(EmbeddingResponse {
            data: input
                .iter()
                .enumerate()
                .map(|(index, text)| IndexedEmbedding {
                    index,
                    embedding: Self::vector_for(text),
                })
                .collect(),
            model: "echo".to_string(),
            usage: None,
        })
    }
}

/// Brute-force cosine index with switchable failures.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    vectors: Mutex<Vec<EmbeddingVector>>,
    upsert_calls: AtomicUsize,
    failing_upserts: Mutex<HashSet<usize>>,
    fail_queries: AtomicBool,
    ignore_chat_filter: AtomicBool,
}

impl InMemoryVectorIndex {
    /// Make the `call`-th upsert (0-based) fail.
    pub fn fail_upsert_call(&self, call: usize) {
        self.failing_upserts.lock().unwrap().insert(call);
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    /// Return matches from every chat, like a backend with a broken filter.
    pub fn ignore_chat_filter(&self) {
        self.ignore_chat_filter.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.vectors.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.vectors
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.key.clone())
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.lock().unwrap().contains(&call) {
            return Err(TelequestError::VectorIndex(format!("upsert call {call} rejected")));
        }

        let mut stored = self.vectors.lock().unwrap();
        for vector in vectors {
            stored.retain(|v| v.key != vector.key);
            stored.push(vector.clone());
        }
        Ok(())
    }

    async fn query(&self, chat_id: i64, vector: &[f32], top_k: usize) -> Result<QueryResponse> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(TelequestError::VectorIndex("query rejected".to_string()));
        }

        let ignore_filter = self.ignore_chat_filter.load(Ordering::SeqCst);
        let mut matches: Vec<QueryMatch> = self
            .vectors
            .lock()
            .unwrap()
            .iter()
            .filter(|v| ignore_filter || v.chat_id == chat_id)
            .map(|v| QueryMatch {
                id: v.key.clone(),
                score: cosine(vector, &v.values),
                values: None,
                metadata: Some(VectorMetadata {
                    chat_id: v.chat_id,
                    message_id: Some(v.message_id),
                }),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        if !ignore_filter {
            matches.truncate(top_k);
        }

        Ok(QueryResponse {
            matches,
            namespace: String::new(),
        })
    }
}

/// Completion service that answers with a fixed reply after an optional delay.
pub struct ScriptedCompletion {
    reply: std::result::Result<String, String>,
    delay: Duration,
    calls: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
}

impl ScriptedCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.reply.clone().map_err(TelequestError::Llm)
    }
}

/// One token per character.
pub struct CharTokenCounter;

impl TokenCounter for CharTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count()
    }
}
