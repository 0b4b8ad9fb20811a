//! Answer generation with bounded retry.
//!
//! A [`LanguageModel`] performs exactly one remote completion call. The
//! [`Generator`] wraps it with a per-attempt timeout and a bounded
//! exponential-backoff retry for transient failures, and packages the
//! completion with the sources it was grounded on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::SearchResult;
use crate::error::{RagError, Result, Stage};
use crate::prompt::GenerationRequest;

/// A remote language model answering one request per call.
///
/// Implementations must not retry on their own; the [`Generator`] owns that policy.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `request` and return the completion text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// Model name, for logs and errors.
    fn name(&self) -> &str;
}

/// The final output of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The simplified explanation produced by the model.
    pub explanation: String,
    /// The passages the request was built from, best first.
    ///
    /// Empty when the model answered from its own knowledge.
    pub sources: Vec<SearchResult>,
    /// Whether the top passage had to be cut to fit the context budget.
    #[serde(default)]
    pub context_truncated: bool,
}

impl Answer {
    /// Whether the explanation was backed by any retrieved passage.
    pub fn is_grounded(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// How often and how patiently to retry transient generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause before the second attempt.
    pub initial_backoff: Duration,
    /// Factor applied to the pause after every further failure.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_millis(500), multiplier: 2 }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Pause after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Default wait for a single completion.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns [`GenerationRequest`]s into [`Answer`]s through a [`LanguageModel`].
pub struct Generator {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Generator {
    /// Create a generator with the default timeout and retry policy.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, timeout: DEFAULT_GENERATION_TIMEOUT, retry: RetryPolicy::default() }
    }

    /// Set the wait for each attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Name of the wrapped model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate an answer for `request`.
    ///
    /// Timeouts and transient refusals are retried up to the policy's attempt
    /// count with exponential backoff; every other error returns immediately.
    ///
    /// # Errors
    ///
    /// - [`RagError::GenerationTimeout`] when the last attempt timed out
    /// - [`RagError::GenerationRefused`] when the endpoint rejected the request
    /// - [`RagError::ModelUnavailable`] when the endpoint could not be reached
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Answer> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(request, attempt).await {
                Ok(explanation) => {
                    info!(
                        model = self.model.name(),
                        attempt,
                        grounded = request.is_grounded(),
                        source_count = request.sources.len(),
                        "generated explanation"
                    );
                    return Ok(Answer {
                        explanation,
                        sources: request.sources.clone(),
                        context_truncated: request.truncated,
                    });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let pause = self.retry.backoff(attempt);
                    warn!(
                        model = self.model.name(),
                        attempt,
                        max_attempts,
                        backoff_ms = pause.as_millis() as u64,
                        error = %e,
                        "transient generation failure, retrying"
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(model = self.model.name(), attempt, error = %e, "generation failed");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest, attempt: u32) -> Result<String> {
        let completion = match tokio::time::timeout(self.timeout, self.model.complete(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(RagError::GenerationTimeout { attempts: attempt, timeout: self.timeout }),
        };

        match completion {
            Ok(text) if text.trim().is_empty() => Err(RagError::GenerationRefused {
                reason: format!("model '{}' returned an empty completion", self.model.name()),
                transient: false,
            }),
            Ok(text) => Ok(text.trim().to_string()),
            Err(RagError::GenerationTimeout { .. }) => {
                Err(RagError::GenerationTimeout { attempts: attempt, timeout: self.timeout })
            }
            Err(e) => Err(e.at_stage(Stage::Generation)),
        }
    }
}
