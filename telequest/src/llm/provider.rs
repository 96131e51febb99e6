use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{Result, TelequestError};

use super::api::LlmApiClient;
use super::service::{ChatMessage, CompletionService};

/// The configured completion backend, or the reason there is none.
#[derive(Clone)]
pub struct LlmProvider {
    service: Option<Arc<dyn CompletionService>>,
    model: String,
    unavailable_reason: Option<String>,
}

impl LlmProvider {
    pub fn new(config: &LlmConfig) -> Self {
        match LlmApiClient::new(config) {
            Ok(client) => Self::with_service(Arc::new(client), &config.model),
            Err(e) => {
                tracing::warn!(model = %config.model, error = %e, "LLM unavailable");
                Self {
                    model: config.model.clone(),
                    ..Self::unavailable(&e.to_string())
                }
            }
        }
    }

    pub fn with_service(service: Arc<dyn CompletionService>, model: &str) -> Self {
        Self {
            service: Some(service),
            model: model.to_string(),
            unavailable_reason: None,
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            service: None,
            model: String::new(),
            unavailable_reason: Some(reason.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.service.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for LlmProvider {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        match self.service {
            Some(ref service) => service.complete(messages, temperature).await,
            None => Err(TelequestError::LlmUnavailable(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "no completion backend".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedCompletion;

    #[tokio::test]
    async fn test_unavailable_provider_reports_reason() {
        let provider = LlmProvider::new(&LlmConfig {
            model: "openai/gpt-3.5-turbo".to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 5,
        });

        assert!(!provider.is_available());
        assert_eq!(provider.model(), "openai/gpt-3.5-turbo");

        let result = provider.complete(&[ChatMessage::user("hi")], 0.0).await;
        match result {
            Err(TelequestError::LlmUnavailable(reason)) => assert!(reason.contains("API key")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delegates_to_service() {
        let provider =
            LlmProvider::with_service(Arc::new(ScriptedCompletion::replying("ok")), "scripted");

        assert!(provider.is_available());
        let reply = provider.complete(&[ChatMessage::user("hi")], 0.0).await.unwrap();
        assert_eq!(reply, "ok");
    }
}
