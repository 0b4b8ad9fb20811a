//! Query-time retrieval: embed the query, search the index.

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::index::VectorIndex;

/// Number of passages retrieved when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 4;

/// Largest `k` a caller may request.
pub const MAX_TOP_K: usize = 50;

/// Retrieves the passages most similar to a query.
///
/// Query embeddings are not cached; every call embeds its query afresh.
pub struct Retriever<'a> {
    embedder: &'a dyn EmbeddingProvider,
    index: &'a VectorIndex,
}

impl<'a> Retriever<'a> {
    /// Create a retriever over `index`, embedding queries with `embedder`.
    pub fn new(embedder: &'a dyn EmbeddingProvider, index: &'a VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// Return up to `k` passages ranked by descending similarity to `query`.
    ///
    /// An empty index yields an empty result without touching the embedder.
    ///
    /// # Errors
    ///
    /// - [`RagError::ValidationError`] for an empty query or `k` outside `1..=MAX_TOP_K`
    /// - [`RagError::ModelUnavailable`] if the query cannot be embedded
    /// - [`RagError::IndexCorrupted`] if the embedder no longer matches the index
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        validate_query(query)?;
        if k == 0 || k > MAX_TOP_K {
            return Err(RagError::validation(format!("k ({k}) must be between 1 and {MAX_TOP_K}")));
        }

        if self.index.is_empty() {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }
        self.index.ensure_compatible(self.embedder)?;

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e.at_stage(Stage::Query)
        })?;

        let results = self.index.search(&query_embedding, k)?;
        debug!(k, result_count = results.len(), "retrieved passages");
        Ok(results)
    }
}

/// Reject queries with no visible content.
pub(crate) fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RagError::validation("query must not be empty"));
    }
    Ok(())
}
