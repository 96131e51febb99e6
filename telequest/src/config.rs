use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// First set variable among `vars`, e.g. a service-specific key falling back to `OPENAI_API_KEY`.
fn env_first(vars: &[&str]) -> Option<String> {
    vars.iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub vector_index: VectorIndexConfig,
    pub llm: LlmConfig,
    pub answering: AnsweringConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: usize,
    /// Upper bound on texts per embedding request.
    pub max_inputs: usize,
    /// Texts per request when embedding a whole history.
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_multiplier: f64,
    pub backoff_max_secs: u64,
}

/// Similarity index settings. Without a `url` vectors live in the local database.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorIndexConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub namespace: Option<String>,
    pub upsert_batch_size: usize,
    pub timeout_secs: u64,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnsweringConfig {
    /// Hard wall-clock bound on a single completion call.
    pub timeout_secs: u64,
    pub token_budget: usize,
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Only the most recent `max_window` texts of a history are embedded.
    pub max_window: usize,
    pub history_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("TELEQUEST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("TELEQUEST_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:telequest.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "openai/text-embedding-ada-002".to_string()),
                api_key: env_first(&["EMBEDDING_API_KEY", "OPENAI_API_KEY"]),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 1536),
                max_inputs: parse_env_or("EMBEDDING_MAX_INPUTS", 2000),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 2000),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT_SECS", 60),
                backoff_base_ms: parse_env_or("EMBEDDING_BACKOFF_BASE_MS", 1000),
                backoff_multiplier: parse_env_or("EMBEDDING_BACKOFF_MULTIPLIER", 1.2),
                backoff_max_secs: parse_env_or("EMBEDDING_BACKOFF_MAX_SECS", 600),
            },
            vector_index: VectorIndexConfig {
                url: env::var("VECTOR_INDEX_URL").ok(),
                api_key: env::var("VECTOR_INDEX_API_KEY").ok(),
                namespace: env::var("VECTOR_INDEX_NAMESPACE").ok(),
                upsert_batch_size: parse_env_or("VECTOR_UPSERT_BATCH_SIZE", 100),
                timeout_secs: parse_env_or("VECTOR_INDEX_TIMEOUT_SECS", 30),
            },
            llm: LlmConfig {
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "openai/gpt-3.5-turbo".to_string()),
                api_key: env_first(&["LLM_API_KEY", "OPENAI_API_KEY"]),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", 60),
            },
            answering: AnsweringConfig {
                timeout_secs: parse_env_or("ANSWER_TIMEOUT_SECS", 30),
                token_budget: parse_env_or("ANSWER_TOKEN_BUDGET", 4096 - 500),
                top_k: parse_env_or("RETRIEVAL_TOP_K", 5),
            },
            ingestion: IngestionConfig {
                max_window: parse_env_or("INGEST_MAX_WINDOW", 7000),
                history_max_bytes: parse_env_or("HISTORY_MAX_BYTES", 15 * 1024 * 1024),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Providers that speak the OpenAI-compatible HTTP API.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

/// Provider-specific default base URLs
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}
