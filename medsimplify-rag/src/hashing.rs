//! Lexical feature-hashing embedder for tests and air-gapped runs.
//!
//! [`HashingEmbedder`] maps text to a bag-of-words vector without any network
//! access or model download: every token is hashed into one of `dimensions`
//! buckets with a pseudo-random sign, term frequencies are damped
//! logarithmically, and the result is L2-normalised. It captures lexical
//! overlap only, so "hypertension" and "high blood pressure" score zero.
//! Use [`SentenceEmbedder`](crate::sentence::SentenceEmbedder) for semantic retrieval.

use std::collections::HashMap;
use std::hash::Hasher;

use async_trait::async_trait;
use fnv::FnvHasher;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};

/// Function words that carry no topical signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "has",
    "have", "how", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was",
    "what", "when", "which", "who", "why", "with",
];

/// A deterministic embedding model based on feature hashing.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, model_id: format!("hashing-v1-{dimensions}") }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        // sorted so float accumulation order never depends on HashMap iteration order
        let mut terms: Vec<(String, u32)> = counts.into_iter().collect();
        terms.sort_unstable();
        for (term, count) in terms {
            let mut hasher = FnvHasher::default();
            hasher.write(term.as_bytes());
            let hash = hasher.finish();
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * (1.0 + (count as f32).ln());
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(RagError::ModelUnavailable {
                stage: Stage::Ingestion,
                model: self.model_id.clone(),
                message: "hashing model configured with zero dimensions".into(),
            });
        }
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
