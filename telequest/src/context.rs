//! Packing retrieved messages into a completion prompt under a token budget.

use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

use crate::error::{Result, TelequestError};

pub const INTRODUCTION: &str = "The below messages are from individual members of a Telegram group chat. \
Use them to answer the subsequent question. If the answer cannot be found in the messages, \
write \"I could not find an answer.\"";

pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE token counter for an OpenAI model.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Tokenizer of `model`; unknown models fall back to `cl100k_base`.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                tracing::debug!(model, "No tokenizer registered for model, using cl100k_base");
                cl100k_base()
                    .map_err(|e| TelequestError::Internal(format!("Failed to load tokenizer: {e}")))?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

fn wrap_candidate(text: &str) -> String {
    format!("\n\nTelegram Message:\n\"\"\"\n{text}\n\"\"\"")
}

fn question_suffix(question: &str) -> String {
    format!("\n\nQuestion: {question}")
}

/// Build the prompt from the introduction, as many leading `candidates` as
/// fit in `token_budget`, and the question.
///
/// Candidates are taken in the given order and never trimmed; the first one
/// that does not fit ends the packing. If even the bare prompt is over budget
/// it is returned unchanged.
pub fn build_prompt<S: AsRef<str>>(
    question: &str,
    candidates: &[S],
    token_budget: usize,
    counter: &dyn TokenCounter,
) -> String {
    let suffix = question_suffix(question);
    let mut prompt = INTRODUCTION.to_string();
    let mut included = 0;

    for candidate in candidates {
        let next = wrap_candidate(candidate.as_ref());
        let tokens = counter.count_tokens(&format!("{prompt}{next}{suffix}"));
        if tokens > token_budget {
            break;
        }
        prompt.push_str(&next);
        included += 1;
    }

    tracing::debug!(
        included,
        offered = candidates.len(),
        token_budget,
        "Assembled prompt"
    );

    prompt + &suffix
}
