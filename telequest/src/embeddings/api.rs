use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::Serialize;
use std::time::Duration;

use crate::config::{default_base_url, parse_provider_model, EmbeddingsConfig};
use crate::error::{Result, TelequestError};

use super::service::{EmbeddingResponse, EmbeddingService};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn from_embeddings_config(config: &EmbeddingsConfig) -> Self {
        let (provider, model) = parse_provider_model(&config.model);

        Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string()),
            api_key: config.api_key.clone(),
            model: model.to_string(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// OpenAI-compatible `POST /embeddings` client.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    config: ApiConfig,
}

impl EmbeddingApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TelequestError::Embedding(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                    TelequestError::Embedding(format!("Invalid API key header: {e}"))
                })?,
            );
        }

        Ok(headers)
    }
}

#[async_trait]
impl EmbeddingService for EmbeddingApiClient {
    async fn create_embeddings(&self, input: &[String]) -> Result<EmbeddingResponse> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input,
        };
        let url = format!("{}/embeddings", self.config.base_url);

        let resp = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| TelequestError::Embedding(format!("Request failed: {e}")))?;

        let status = resp.status();

        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(|e| TelequestError::Embedding(format!("Failed to parse response: {e}")));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(TelequestError::RateLimited { retry_after });
        }

        let body = resp.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TelequestError::ApiAuth(body));
        }

        Err(TelequestError::Embedding(format!("API error {status}: {body}")))
    }
}
