//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] owns one session's index and coordinates the two
//! workflows: ingestion (chunk → embed → build index) and answering
//! (retrieve → assemble → generate).
//!
//! # Example
//!
//! ```rust,ignore
//! use medsimplify_rag::{Document, Generator, HashingEmbedder, RagConfig, RagPipeline};
//!
//! let mut pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbedder::default()))
//!     .generator(Generator::new(Arc::new(my_model)))
//!     .build()?;
//!
//! pipeline.ingest(&[Document::from_extracted("leaflet.pdf", &text)]).await?;
//! let answer = pipeline.answer("what is hypertension").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::generation::{Answer, Generator};
use crate::index::{IndexEntry, VectorIndex};
use crate::prompt::PromptAssembler;
use crate::retriever::Retriever;

/// Summary of an [`ingest`](RagPipeline::ingest) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Number of documents indexed.
    pub documents: usize,
    /// Number of chunks indexed across all documents.
    pub chunks: usize,
}

/// One session's retrieval-augmented generation pipeline.
///
/// `ingest` takes `&mut self` and `answer` takes `&self`, so the index can
/// never change while a query is reading it. Use one pipeline per user.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    assembler: PromptAssembler,
    generator: Generator,
    index: VectorIndex,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return the current index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Replace the document set: chunk → embed → build a fresh index.
    ///
    /// The previous index is discarded, never merged. It stays in place if
    /// ingestion fails. An empty document set yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelUnavailable`] (stage `ingestion`) if embedding
    /// fails and [`RagError::IndexCorrupted`] if the model returns vectors of
    /// the wrong width.
    pub async fn ingest(&mut self, documents: &[Document]) -> Result<IngestReport> {
        let mut entries = Vec::new();

        for document in documents {
            let chunks = self.chunker.chunk(document);
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                e.at_stage(Stage::Ingestion)
            })?;

            if embeddings.len() != chunks.len() {
                return Err(RagError::ModelUnavailable {
                    stage: Stage::Ingestion,
                    model: self.embedding_provider.model_id().to_string(),
                    message: format!(
                        "got {} embeddings for {} chunks of document '{}'",
                        embeddings.len(),
                        chunks.len(),
                        document.id
                    ),
                });
            }

            info!(document.id = %document.id, chunk_count = chunks.len(), "chunked and embedded document");
            entries.extend(
                chunks.into_iter().zip(embeddings).map(|(chunk, embedding)| IndexEntry { chunk, embedding }),
            );
        }

        let index = VectorIndex::build(
            self.embedding_provider.model_id(),
            self.embedding_provider.dimensions(),
            entries,
        )?;

        let report = IngestReport { documents: documents.len(), chunks: index.len() };
        self.index = index;
        info!(documents = report.documents, chunk_count = report.chunks, "ingested document set");
        Ok(report)
    }

    /// Install a previously built index, e.g. one loaded from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupted`] if the index was built by another model.
    pub fn replace_index(&mut self, index: VectorIndex) -> Result<()> {
        index.ensure_compatible(self.embedding_provider.as_ref())?;
        self.index = index;
        Ok(())
    }

    /// Retrieve the `k` passages most similar to `query`.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        Retriever::new(self.embedding_provider.as_ref(), &self.index).retrieve(query, k).await
    }

    /// Answer `query` using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// See [`answer_with_k`](Self::answer_with_k).
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        self.answer_with_k(query, self.config.top_k).await
    }

    /// Answer `query` from the `k` most similar passages.
    ///
    /// With an empty index the model answers from its own knowledge and the
    /// returned [`Answer`] has no sources.
    ///
    /// # Errors
    ///
    /// - [`RagError::ValidationError`] for an empty query or out-of-range `k`
    /// - [`RagError::ModelUnavailable`] if the embedding or generation model cannot be reached
    /// - [`RagError::GenerationTimeout`] / [`RagError::GenerationRefused`] from generation
    pub async fn answer_with_k(&self, query: &str, k: usize) -> Result<Answer> {
        let results = self.retrieve(query, k).await?;
        if results.is_empty() {
            info!("no grounding passages available, answering from model knowledge");
        }

        let request = self.assembler.assemble(query, &results)?;
        self.generator.generate(&request).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `generator` are required. The chunker defaults to
/// a [`FixedSizeChunker`] and the assembler to a [`PromptAssembler`], both
/// sized from the config.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().chunk_size(200).chunk_overlap(50).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .generator(Generator::new(Arc::new(model)))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    assembler: Option<PromptAssembler>,
    generator: Option<Generator>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the prompt assembler.
    pub fn assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Set the generator.
    pub fn generator(mut self, generator: Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`] with an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ValidationError`] if a required component is
    /// missing or the configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::validation("embedding_provider is required"))?;
        let generator =
            self.generator.ok_or_else(|| RagError::validation("generator is required"))?;

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let assembler =
            self.assembler.unwrap_or_else(|| PromptAssembler::new(config.max_context_chars));

        let index =
            VectorIndex::empty(embedding_provider.model_id(), embedding_provider.dimensions());

        Ok(RagPipeline { config, embedding_provider, chunker, assembler, generator, index })
    }
}
