//! Local sentence-transformer embeddings.
//!
//! [`SentenceEmbedder`] runs a pretrained sentence-embedding model in-process
//! through `fastembed` (ONNX Runtime). The default model is
//! `sentence-transformers/all-MiniLM-L6-v2`, 384-dimensional and mean pooled,
//! so paraphrases such as "hypertension" and "high blood pressure" land close
//! together. Model files are fetched from Hugging Face on first load and
//! cached on disk.
//!
//! Inference is CPU-bound and runs on the blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};

/// Identifier of the default model.
pub const DEFAULT_SENTENCE_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// An [`EmbeddingProvider`] backed by a local sentence-transformer model.
///
/// # Example
///
/// ```rust,ignore
/// use medsimplify_rag::sentence::SentenceEmbedder;
///
/// let embedder = SentenceEmbedder::load(None).await?;
/// assert_eq!(embedder.dimensions(), 384);
/// ```
pub struct SentenceEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_id: String,
    dimensions: usize,
}

impl SentenceEmbedder {
    /// Load `all-MiniLM-L6-v2`, caching model files under `cache_dir` when given.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelUnavailable`] if the model cannot be
    /// downloaded or initialised.
    pub async fn load(cache_dir: Option<PathBuf>) -> Result<Self> {
        Self::load_model(EmbeddingModel::AllMiniLML6V2, DEFAULT_SENTENCE_MODEL, cache_dir).await
    }

    /// Load any model `fastembed` supports, identified by `model_id` in
    /// indexes and snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelUnavailable`] if the model cannot be
    /// downloaded or initialised.
    pub async fn load_model(
        model: EmbeddingModel,
        model_id: impl Into<String>,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let model_id = model_id.into();
        let loader_id = model_id.clone();

        let (model, dimensions) = tokio::task::spawn_blocking(move || {
            let mut options = InitOptions::new(model).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            let mut model = TextEmbedding::try_new(options)
                .map_err(|e| unavailable(&loader_id, format!("failed to load model: {e}")))?;

            // width is only known after a first inference
            let sample = model
                .embed(vec!["test".to_string()], None)
                .map_err(|e| unavailable(&loader_id, format!("model self-check failed: {e}")))?;
            let dimensions = sample.first().map(Vec::len).unwrap_or(0);
            Ok::<_, RagError>((model, dimensions))
        })
        .await
        .map_err(|e| unavailable(&model_id, format!("model loader did not finish: {e}")))??;

        if dimensions == 0 {
            return Err(unavailable(&model_id, "model produced an empty embedding".to_string()));
        }

        info!(model = %model_id, dimensions, "loaded sentence embedding model");
        Ok(Self { model: Arc::new(Mutex::new(model)), model_id, dimensions })
    }
}

fn unavailable(model: &str, message: String) -> RagError {
    RagError::ModelUnavailable { stage: Stage::Ingestion, model: model.to_string(), message }
}

#[async_trait]
impl EmbeddingProvider for SentenceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| unavailable(&self.model_id, "model returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let worker_id = self.model_id.clone();
        let inputs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| unavailable(&worker_id, "model lock poisoned".to_string()))?;
            model
                .embed(inputs, None)
                .map_err(|e| unavailable(&worker_id, format!("inference failed: {e}")))
        })
        .await
        .map_err(|e| unavailable(&self.model_id, format!("inference did not finish: {e}")))??;

        if embeddings.len() != texts.len() {
            return Err(unavailable(
                &self.model_id,
                format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
            ));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(unavailable(
                &self.model_id,
                format!("expected {} dimensions, got {}", self.dimensions, bad.len()),
            ));
        }

        debug!(model = %self.model_id, count = embeddings.len(), "embedded batch");
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
