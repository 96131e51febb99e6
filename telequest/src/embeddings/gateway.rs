use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures::Stream;

use crate::batch;
use crate::config::EmbeddingsConfig;
use crate::error::{Result, TelequestError};

use super::service::{EmbeddingResponse, EmbeddingService};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Largest number of texts a single request may carry.
    pub max_inputs: usize,
    /// Texts per request in [`EmbeddingGateway::batch_embed`].
    pub batch_size: usize,
    pub backoff_base: Duration,
    pub backoff_multiplier: f64,
    pub backoff_max: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_inputs: 2000,
            batch_size: 2000,
            backoff_base: Duration::from_secs(1),
            backoff_multiplier: 1.2,
            backoff_max: Duration::from_secs(600),
        }
    }
}

impl GatewayConfig {
    pub fn from_embeddings_config(config: &EmbeddingsConfig) -> Self {
        let max_inputs = config.max_inputs.max(1);
        Self {
            max_inputs,
            batch_size: config.batch_size.clamp(1, max_inputs),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_multiplier: config.backoff_multiplier,
            backoff_max: Duration::from_secs(config.backoff_max_secs),
        }
    }
}

/// One embedded slice of a [`EmbeddingGateway::batch_embed`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedBatch {
    /// Position of this batch within the run.
    pub index: usize,
    /// Index of the batch's first text in the caller's input.
    pub offset: usize,
    pub vectors: Vec<Vec<f32>>,
}

/// Order-checked, rate-limit tolerant access to an [`EmbeddingService`].
#[derive(Clone)]
pub struct EmbeddingGateway {
    service: Arc<dyn EmbeddingService>,
    config: GatewayConfig,
}

impl EmbeddingGateway {
    pub fn new(service: Arc<dyn EmbeddingService>, config: GatewayConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Embed `texts`, returning one vector per text in input order.
    ///
    /// Rate-limited requests are retried indefinitely with a growing delay; wrap the
    /// call in a deadline if a ceiling is needed. Every other error is returned as is.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.validate(texts)?;

        let mut backoff = self.backoff();
        let mut attempt: u32 = 0;

        loop {
            match self.service.create_embeddings(texts).await {
                Ok(response) => return Self::into_ordered_vectors(texts.len(), response),
                Err(TelequestError::RateLimited { retry_after }) => {
                    attempt += 1;
                    let scheduled = backoff.next_backoff().unwrap_or(self.config.backoff_max);
                    let delay = retry_after
                        .map(Duration::from_secs)
                        .filter(|requested| *requested > scheduled)
                        .unwrap_or(scheduled);

                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        inputs = texts.len(),
                        "Embedding service rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| TelequestError::Embedding("No embedding generated".to_string()))
    }

    /// Lazily embed the most recent `max_window` texts, one provider-sized batch at a time.
    ///
    /// Each item's `offset` indexes into `texts`, so callers can line batches up with
    /// whatever produced the texts. The stream stops after the first error.
    pub fn batch_embed(
        &self,
        texts: Vec<String>,
        max_window: usize,
    ) -> impl Stream<Item = Result<EmbeddedBatch>> + Send + '_ {
        let start = texts.len().saturating_sub(max_window);
        let batch_size = self.config.batch_size;

        async_stream::try_stream! {
            let batches = batch::split(&texts[start..], batch_size)?;
            tracing::debug!(
                total = texts.len(),
                window_start = start,
                batches = batches.len(),
                "Embedding history"
            );

            let mut offset = start;
            for (index, batch) in batches.into_iter().enumerate() {
                let vectors = self.embed(&batch).await?;
                let len = batch.len();
                yield EmbeddedBatch { index, offset, vectors };
                offset += len;
            }
        }
    }

    fn validate(&self, texts: &[String]) -> Result<()> {
        if texts.is_empty() || texts.len() > self.config.max_inputs {
            return Err(TelequestError::InvalidInput(format!(
                "expected between 1 and {} texts, got {}",
                self.config.max_inputs,
                texts.len()
            )));
        }

        if let Some(position) = texts.iter().position(|text| text.is_empty()) {
            return Err(TelequestError::InvalidInput(format!(
                "text at position {position} is empty"
            )));
        }

        Ok(())
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.backoff_base)
            .with_multiplier(self.config.backoff_multiplier)
            .with_randomization_factor(0.0)
            .with_max_interval(self.config.backoff_max)
            .with_max_elapsed_time(None)
            .build()
    }

    fn into_ordered_vectors(expected: usize, response: EmbeddingResponse) -> Result<Vec<Vec<f32>>> {
        if response.data.len() != expected {
            return Err(TelequestError::Embedding(format!(
                "Embedding service returned {} vectors for {} inputs",
                response.data.len(),
                expected
            )));
        }

        response
            .data
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                if item.index == position {
                    Ok(item.embedding)
                } else {
                    Err(TelequestError::OrderingViolation {
                        position,
                        index: item.index,
                    })
                }
            })
            .collect()
    }
}
