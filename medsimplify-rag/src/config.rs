//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::chunking::validate_window;
use crate::error::{RagError, Result};
use crate::retriever::{DEFAULT_TOP_K, MAX_TOP_K};

/// Smallest accepted context budget: room for a source tag and some passage text.
pub const MIN_CONTEXT_CHARS: usize = 128;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Chunk size in words.
    pub chunk_size: usize,
    /// Number of words shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to retrieve per query.
    pub top_k: usize,
    /// Character budget for the context block of a generation request.
    pub max_context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 200, chunk_overlap: 50, top_k: DEFAULT_TOP_K, max_context_chars: 6000 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ValidationError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k` is outside `1..=MAX_TOP_K`
    /// - `max_context_chars < MIN_CONTEXT_CHARS`
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(RagError::validation(format!(
                "top_k ({}) must be between 1 and {MAX_TOP_K}",
                self.top_k
            )));
        }
        if self.max_context_chars < MIN_CONTEXT_CHARS {
            return Err(RagError::validation(format!(
                "max_context_chars ({}) must be at least {MIN_CONTEXT_CHARS}",
                self.max_context_chars
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk size in words.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in words.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of results retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the character budget of the context block.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_inconsistent_values() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().top_k(MAX_TOP_K + 1).build().is_err());
        assert!(RagConfig::builder().max_context_chars(0).build().is_err());
        assert!(RagConfig::builder().max_context_chars(30).build().is_err());
        assert!(RagConfig::builder().max_context_chars(MIN_CONTEXT_CHARS).build().is_ok());
        assert_eq!(RagConfig::builder().build().unwrap(), RagConfig::default());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: RagConfig = serde_json::from_str(r#"{ "top_k": 2 }"#).unwrap();
        assert_eq!(config.top_k, 2);
        assert_eq!(config.chunk_size, RagConfig::default().chunk_size);
    }
}
