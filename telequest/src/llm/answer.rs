use std::sync::Arc;
use std::time::Duration;

use crate::context::{build_prompt, TokenCounter};
use crate::error::{Result, TelequestError};

use super::service::{ChatMessage, CompletionService};

/// Reply used whenever no answer could be produced.
pub const NO_ANSWER: &str = "I could not find an answer.";

pub const SYSTEM_PROMPT: &str = "You have access to messages sent from people who are members of \
a Telegram group chat and can answer questions you have seen answered previously. Your answers \
are meant to be concise, but contain all relevant information.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered(String),
    TimedOut,
}

impl AnswerOutcome {
    pub fn into_text(self) -> String {
        match self {
            AnswerOutcome::Answered(text) => text,
            AnswerOutcome::TimedOut => NO_ANSWER.to_string(),
        }
    }
}

/// Turns a question plus retrieved message texts into an answer.
#[derive(Clone)]
pub struct AnswerGenerator {
    completion: Arc<dyn CompletionService>,
    counter: Arc<dyn TokenCounter>,
    token_budget: usize,
}

impl AnswerGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        counter: Arc<dyn TokenCounter>,
        token_budget: usize,
    ) -> Self {
        Self {
            completion,
            counter,
            token_budget,
        }
    }

    /// Ask the model, waiting at most `timeout`.
    ///
    /// The completion runs on its own task, which is aborted when the wait
    /// expires. Aborting only stops waiting; a request already sent may still
    /// be processed by the provider.
    pub async fn try_ask(
        &self,
        question: &str,
        candidates: &[String],
        timeout: Duration,
    ) -> Result<AnswerOutcome> {
        let prompt = build_prompt(question, candidates, self.token_budget, self.counter.as_ref());
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let completion = Arc::clone(&self.completion);
        let mut task = tokio::spawn(async move { completion.complete(&messages, 0.0).await });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(reply)) => reply.map(AnswerOutcome::Answered),
            Ok(Err(join_error)) => Err(TelequestError::Internal(format!(
                "completion task failed: {join_error}"
            ))),
            Err(_) => {
                task.abort();
                tracing::warn!(timeout_secs = timeout.as_secs_f64(), "Completion timed out");
                Ok(AnswerOutcome::TimedOut)
            }
        }
    }

    /// Like [`try_ask`](Self::try_ask), with a timeout reported as [`NO_ANSWER`].
    pub async fn ask(&self, question: &str, candidates: &[String], timeout: Duration) -> Result<String> {
        Ok(self.try_ask(question, candidates, timeout).await?.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::INTRODUCTION;
    use crate::llm::Role;
    use crate::test_support::{CharTokenCounter, ScriptedCompletion};
    use pretty_assertions::assert_eq;

    fn generator(completion: Arc<ScriptedCompletion>, budget: usize) -> AnswerGenerator {
        AnswerGenerator::new(completion, Arc::new(CharTokenCounter), budget)
    }

    #[tokio::test]
    async fn test_ask_sends_system_and_user_messages() {
        let completion = Arc::new(ScriptedCompletion::replying("Friday at noon."));
        let generator = generator(completion.clone(), 10_000);

        let answer = generator
            .ask(
                "When is the deadline?",
                &["The deadline is Friday at noon".to_string()],
                Duration::from_secs(30),
            )
            .await
            .unwrap();

        assert_eq!(answer, "Friday at noon.");

        let calls = completion.calls();
        assert_eq!(calls.len(), 1);
        let (messages, temperature) = &calls[0];
        assert_eq!(*temperature, 0.0);
        assert_eq!(messages[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with(INTRODUCTION));
        assert!(messages[1].content.contains("The deadline is Friday at noon"));
        assert!(messages[1].content.ends_with("Question: When is the deadline?"));
    }

    #[tokio::test]
    async fn test_prompt_respects_budget() {
        let completion = Arc::new(ScriptedCompletion::replying("ok"));
        let budget = INTRODUCTION.len() + 200;
        let generator = generator(completion.clone(), budget);

        let candidates: Vec<String> = (0..10).map(|i| format!("message number {i}")).collect();
        generator
            .ask("q?", &candidates, Duration::from_secs(30))
            .await
            .unwrap();

        let prompt = &completion.calls()[0].0[1].content;
        assert!(prompt.chars().count() <= budget);
        assert!(prompt.contains("message number 0"));
        assert!(!prompt.contains("message number 9"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_completion_times_out_with_sentinel() {
        let completion = Arc::new(
            ScriptedCompletion::replying("too late").with_delay(Duration::from_secs(60)),
        );
        let generator = generator(completion, 10_000);

        let outcome = generator
            .try_ask("q?", &[], Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(outcome, AnswerOutcome::TimedOut);

        let answer = generator
            .ask("q?", &[], Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(answer, NO_ANSWER);
    }

    #[tokio::test]
    async fn test_completion_errors_propagate() {
        let completion = Arc::new(ScriptedCompletion::failing("model overloaded"));
        let generator = generator(completion, 10_000);

        let result = generator.ask("q?", &[], Duration::from_secs(30)).await;
        match result {
            Err(TelequestError::Llm(msg)) => assert_eq!(msg, "model overloaded"),
            other => panic!("expected llm error, got {other:?}"),
        }
    }
}
