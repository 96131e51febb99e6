use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;

use crate::config::{default_base_url, parse_provider_model, LlmConfig};
use crate::error::{Result, TelequestError};

use super::service::{ChatMessage, CompletionService, Role};

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

impl ApiConfig {
    fn from_llm_config(config: &LlmConfig) -> Self {
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

/// Chat completions over any OpenAI-compatible API.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_config = ApiConfig::from_llm_config(config);

        let (provider, _) = parse_provider_model(&config.model);
        let needs_api_key = !matches!(
            provider.to_lowercase().as_str(),
            "ollama" | "local" | "lmstudio"
        );
        if needs_api_key && api_config.api_key.is_none() {
            return Err(TelequestError::LlmUnavailable(format!(
                "API key required for {}",
                config.model
            )));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_base(api_config.base_url.clone())
            .with_api_key(api_config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api_config.timeout_secs))
            .build()
            .map_err(|error| {
                TelequestError::Llm(format!("Failed to create LLM HTTP client: {error}"))
            })?;

        // async-openai retries server errors internally; keep that inside our timeout
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(api_config.timeout_secs)),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            config: api_config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        CreateChatCompletionRequestArgs::default()
            .model(self.config.model.clone())
            .messages(messages)
            .temperature(temperature)
            .build()
            .map_err(|error| {
                TelequestError::Validation(format!("Invalid LLM completion request: {error}"))
            })
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TelequestError::Llm("LLM response contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(TelequestError::Llm(
                "LLM response contained empty content".to_string(),
            ));
        }

        Ok(message)
    }

    fn rate_limit_error(error: &OpenAIError) -> Option<TelequestError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) =>
            {
                Some(TelequestError::RateLimited { retry_after: None })
            }
            OpenAIError::ApiError(api_error) if is_rate_limit_api_error(api_error) => {
                Some(TelequestError::RateLimited { retry_after: None })
            }
            _ => None,
        }
    }

    fn auth_error(error: &OpenAIError) -> Option<TelequestError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || reqwest_error.status() == Some(reqwest::StatusCode::FORBIDDEN) =>
            {
                Some(TelequestError::ApiAuth(reqwest_error.to_string()))
            }
            OpenAIError::ApiError(api_error) if is_auth_api_error(api_error) => {
                Some(TelequestError::ApiAuth(api_error.message.clone()))
            }
            _ => None,
        }
    }

    fn map_openai_error(error: OpenAIError) -> TelequestError {
        if let Some(mapped) = Self::rate_limit_error(&error).or_else(|| Self::auth_error(&error)) {
            return mapped;
        }

        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                TelequestError::Llm(format!("LLM request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => {
                TelequestError::Llm(format!("LLM API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => {
                TelequestError::Llm(format!("Failed to parse LLM response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => TelequestError::Validation(message),
            other => TelequestError::Llm(other.to_string()),
        }
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.as_str();
    let invalid =
        |error: OpenAIError| TelequestError::Validation(format!("Invalid chat message: {error}"));

    Ok(match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(invalid)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(invalid)?
            .into(),
    })
}

fn is_rate_limit_api_error(api_error: &ApiError) -> bool {
    let message = api_error.message.to_lowercase();
    let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
    let code = api_error.code.clone().unwrap_or_default().to_lowercase();

    message.contains("rate limit")
        || message.contains("too many requests")
        || error_type.contains("rate_limit")
        || code.contains("rate_limit")
        || code == "insufficient_quota"
}

fn is_auth_api_error(api_error: &ApiError) -> bool {
    let message = api_error.message.to_lowercase();
    let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
    let code = api_error.code.clone().unwrap_or_default().to_lowercase();

    message.contains("unauthorized")
        || message.contains("authentication")
        || message.contains("incorrect api key")
        || code.contains("invalid_api_key")
        || error_type.contains("authentication")
}

#[async_trait]
impl CompletionService for LlmApiClient {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = self.build_request(messages, temperature)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::map_openai_error)?;

        if let Some(ref usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM completion received"
            );
        }

        Self::extract_content(response)
    }
}
