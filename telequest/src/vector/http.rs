use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Result, TelequestError};
use crate::models::{EmbeddingVector, QueryResponse, VectorMetadata};

use super::traits::VectorIndex;

#[derive(Debug, Clone)]
pub struct HttpIndexConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub namespace: Option<String>,
    pub timeout_secs: u64,
}

impl HttpIndexConfig {
    /// `None` when no index URL is configured.
    pub fn from_vector_index_config(config: &VectorIndexConfig) -> Option<Self> {
        let base_url = config.url.as_deref()?.trim_end_matches('/').to_string();
        Some(Self {
            base_url,
            api_key: config.api_key.clone(),
            namespace: config.namespace.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: VectorMetadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    filter: serde_json::Value,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

/// Client for a hosted similarity-index service.
pub struct HttpVectorIndex {
    client: Client,
    config: HttpIndexConfig,
}

impl HttpVectorIndex {
    pub fn new(config: HttpIndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                TelequestError::VectorIndex(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.config.base_url))
            .json(body);
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Api-Key", api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TelequestError::VectorIndex(format!("Request to {path} failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TelequestError::ApiAuth(body));
        }
        Err(TelequestError::VectorIndex(format!("{path} returned {status}: {body}")))
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        let request = UpsertRequest {
            vectors: vectors
                .iter()
                .map(|v| WireVector {
                    id: &v.key,
                    values: &v.values,
                    metadata: VectorMetadata {
                        chat_id: v.chat_id,
                        message_id: Some(v.message_id),
                    },
                })
                .collect(),
            namespace: self.config.namespace.as_deref(),
        };

        self.post("/vectors/upsert", &request).await?;
        Ok(())
    }

    async fn query(&self, chat_id: i64, vector: &[f32], top_k: usize) -> Result<QueryResponse> {
        let request = QueryRequest {
            vector,
            top_k,
            filter: json!({ "chat_id": { "$eq": chat_id } }),
            include_metadata: true,
            namespace: self.config.namespace.as_deref(),
        };

        let resp = self.post("/query", &request).await?;
        resp.json()
            .await
            .map_err(|e| TelequestError::VectorIndex(format!("Failed to parse query response: {e}")))
    }
}
