//! Error types for the `medsimplify-rag` crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Chunking, embedding and indexing of the document set.
    Ingestion,
    /// Embedding the query and searching the index.
    Query,
    /// Calling the language model.
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::Query => "query",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid input or configuration, rejected before any work is done.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An embedding or generation backend could not be loaded or reached.
    #[error("Model unavailable during {stage} ({model}): {message}")]
    ModelUnavailable {
        /// The stage that needed the model.
        stage: Stage,
        /// The model or provider name.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation endpoint did not answer within the configured wait.
    #[error("Generation timed out after {attempts} attempt(s) ({timeout:?} per attempt)")]
    GenerationTimeout {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The per-attempt timeout.
        timeout: Duration,
    },

    /// The generation endpoint rejected the request (content policy, quota, auth).
    #[error("Generation refused: {reason}")]
    GenerationRefused {
        /// The reason reported by the endpoint.
        reason: String,
        /// Whether retrying later may succeed (rate limiting).
        transient: bool,
    },

    /// Embeddings of different dimension or model were mixed in one index.
    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),

    /// Saving or loading an index snapshot failed.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl RagError {
    /// Whether this failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::GenerationTimeout { .. } | RagError::GenerationRefused { transient: true, .. }
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RagError::ValidationError(message.into())
    }

    /// Re-attribute a [`RagError::ModelUnavailable`] to the stage that observed it.
    pub(crate) fn at_stage(self, stage: Stage) -> Self {
        match self {
            RagError::ModelUnavailable { model, message, .. } => {
                RagError::ModelUnavailable { stage, model, message }
            }
            other => other,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
