//! Exact nearest-neighbour vector index.
//!
//! [`VectorIndex`] is built once from a full set of [`IndexEntry`]s and is
//! immutable afterwards; a changed document set means building a new index.
//!
//! Similarity is cosine, computed as the inner product of L2-normalised
//! vectors: entries are normalised at build time and the query vector at
//! search time, whatever the embedding model already did. Search is a
//! brute-force scan, which is exact and fast enough for the few thousand
//! chunks a session's documents produce.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// A chunk together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
}

/// An immutable, batch-built vector index owning its entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    model_id: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// An index with no entries; every search returns an empty result.
    pub fn empty(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self { model_id: model_id.into(), dimensions, entries: Vec::new() }
    }

    /// Build an index from all entries at once.
    ///
    /// Entry order is insertion order and decides ties during search.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupted`] if any embedding does not have
    /// exactly `dimensions` components.
    pub fn build(
        model_id: impl Into<String>,
        dimensions: usize,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        let mut entries = entries;
        for entry in &mut entries {
            if entry.embedding.len() != dimensions {
                return Err(RagError::IndexCorrupted(format!(
                    "chunk '{}' has a {}-dimensional embedding, index expects {dimensions}",
                    entry.chunk.id,
                    entry.embedding.len()
                )));
            }
            normalize(&mut entry.embedding);
        }

        let index = Self { model_id: model_id.into(), dimensions, entries };
        info!(model = %index.model_id, dimensions, entry_count = index.len(), "built vector index");
        Ok(index)
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// `k` is clamped to the number of entries. Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupted`] if the query dimension differs from the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::IndexCorrupted(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, dot(&entry.embedding, &query)))
            .collect();

        // stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k.min(self.entries.len()));

        debug!(k, result_count = scored.len(), "index search");

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier of the embedding model that produced the vectors.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Dimension of every vector in the index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Check that this index was built by `provider`'s model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupted`] on a model id or dimension mismatch.
    pub fn ensure_compatible(&self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.model_id != provider.model_id() || self.dimensions != provider.dimensions() {
            return Err(RagError::IndexCorrupted(format!(
                "index built with '{}' ({} dims) cannot be queried with '{}' ({} dims)",
                self.model_id,
                self.dimensions,
                provider.model_id(),
                provider.dimensions()
            )));
        }
        Ok(())
    }

    /// Write the index to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Snapshot`] if serialisation or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec(self)
            .map_err(|e| RagError::Snapshot(format!("failed to serialize index: {e}")))?;
        std::fs::write(path, json).map_err(|e| {
            RagError::Snapshot(format!("failed to write '{}': {e}", path.display()))
        })?;
        info!(path = %path.display(), entry_count = self.len(), "saved index snapshot");
        Ok(())
    }

    /// Read an index written by [`save`](Self::save) and verify it matches `provider`.
    ///
    /// The entries are re-validated as in [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Snapshot`] if the file cannot be read or parsed and
    /// [`RagError::IndexCorrupted`] if it was built by another model.
    pub fn load(path: impl AsRef<Path>, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            RagError::Snapshot(format!("failed to read '{}': {e}", path.display()))
        })?;
        let raw: VectorIndex = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::Snapshot(format!("failed to parse '{}': {e}", path.display()))
        })?;
        let index = Self::build(raw.model_id, raw.dimensions, raw.entries)?;
        index.ensure_compatible(provider)?;
        Ok(index)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit length; the zero vector is left as is and scores 0 against everything.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
