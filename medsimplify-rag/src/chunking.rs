//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! splits a document into fixed-size windows of words with a fixed overlap.
//!
//! The size unit is the whitespace-delimited word, which tracks the token
//! granularity sentence-embedding models consume far better than raw
//! characters. Chunk offsets are still reported in characters so a chunk can
//! be located in its source text exactly.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Always returns at least one chunk, even for an empty document.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into windows of `chunk_size` words, each starting
/// `chunk_size - overlap` words after the previous one.
///
/// Chunk spans tile the document: the first chunk starts at offset 0, the
/// last one ends at the end of the text, and whitespace between two words
/// belongs to the chunk of the preceding word. Consecutive chunks share
/// exactly `overlap` words.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use medsimplify_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(200, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: number of words per chunk
    /// * `chunk_overlap`: number of words shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ValidationError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Number of words per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of words shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute the character spans of all chunks of `text`.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let layout = WordLayout::new(text);
        let words = layout.word_starts.len();

        if words <= self.chunk_size {
            return vec![(0, layout.char_count)];
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut spans = Vec::new();
        let mut first_word = 0;
        loop {
            let last_word = (first_word + self.chunk_size).min(words);
            spans.push((layout.boundary(first_word), layout.boundary(last_word)));
            if last_word == words {
                break;
            }
            first_word += step;
        }
        spans
    }
}

pub(crate) fn validate_window(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::validation("chunk_size must be greater than zero"));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::validation(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Word start positions of a text, in characters.
struct WordLayout {
    word_starts: Vec<usize>,
    char_count: usize,
}

impl WordLayout {
    fn new(text: &str) -> Self {
        let mut word_starts = Vec::new();
        let mut char_count = 0;
        let mut after_space = true;
        for (i, c) in text.chars().enumerate() {
            let space = c.is_whitespace();
            if !space && after_space {
                word_starts.push(i);
            }
            after_space = space;
            char_count = i + 1;
        }
        Self { word_starts, char_count }
    }

    /// Character offset where the span of word `k` begins.
    ///
    /// Word 0 owns any leading whitespace; one past the last word is the end of the text.
    fn boundary(&self, k: usize) -> usize {
        if k == 0 {
            0
        } else if k >= self.word_starts.len() {
            self.char_count
        } else {
            self.word_starts[k]
        }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        // byte position of every char offset, plus the end of the string
        let byte_at: Vec<usize> =
            text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();

        self.spans(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                Chunk {
                    id: format!("{}_{chunk_index}", document.id),
                    document_id: document.id.clone(),
                    start_offset: start,
                    end_offset: end,
                    text: text[byte_at[start]..byte_at[end]].to_string(),
                    metadata,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_windows() {
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::ValidationError(_))));
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::ValidationError(_))));
        assert!(FixedSizeChunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = FixedSizeChunker::new(5, 1).unwrap();
        let chunks = chunker.chunk(&Document::new("d", "three short words"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "three short words");
        assert_eq!((chunks[0].start_offset, chunks[0].end_offset), (0, 17));
    }

    #[test]
    fn empty_text_is_a_single_empty_chunk() {
        let chunker = FixedSizeChunker::new(5, 1).unwrap();
        let chunks = chunker.chunk(&Document::new("d", ""));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].id, "d_0");
    }

    #[test]
    fn windows_share_the_overlap() {
        let chunker = FixedSizeChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk(&Document::new("d", "a b c d e f g"));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["a b c ", "c d e ", "e f g"]);
        assert_eq!(chunks[1].metadata.get("chunk_index").map(String::as_str), Some("1"));
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let chunker = FixedSizeChunker::new(1, 0).unwrap();
        let chunks = chunker.chunk(&Document::new("d", "ödem fieber"));
        assert_eq!(chunks[0].text, "ödem ");
        assert_eq!((chunks[1].start_offset, chunks[1].end_offset), (5, 11));
        assert_eq!(chunks[1].text, "fieber");
    }
}
