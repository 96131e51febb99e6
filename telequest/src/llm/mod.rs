mod answer;
mod api;
mod provider;
mod service;

pub use answer::{AnswerGenerator, AnswerOutcome, NO_ANSWER, SYSTEM_PROMPT};
pub use api::LlmApiClient;
pub use provider::LlmProvider;
pub use service::{ChatMessage, CompletionService, Role};
