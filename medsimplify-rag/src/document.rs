//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document: extracted plain text plus an identifier such as its filename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document from text used as-is.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Create a document from raw extracted text.
    ///
    /// Runs of whitespace (line breaks, tabs, the column gaps PDF extraction
    /// leaves behind) are collapsed into single spaces and the ends trimmed,
    /// so chunk boundaries are counted over the visible text only.
    pub fn from_extracted(id: impl Into<String>, raw_text: &str) -> Self {
        let text = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");
        let id = id.into();
        let metadata = HashMap::from([("source".to_string(), id.clone())]);
        Self { id, text, metadata }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A contiguous span of a [`Document`].
///
/// Offsets count Unicode scalar values (`char`s) and are half-open:
/// `text == document.text.chars().skip(start_offset).take(end_offset - start_offset)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Character offset of the first character of the chunk.
    pub start_offset: usize,
    /// Character offset one past the last character of the chunk.
    pub end_offset: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Number of characters covered by this chunk.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}
