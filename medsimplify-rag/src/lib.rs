//! # medsimplify-rag
//!
//! Retrieval-augmented generation core for explaining medical text in plain
//! language.
//!
//! ## Overview
//!
//! Ingestion turns extracted document text into an in-memory vector index:
//!
//! - [`FixedSizeChunker`] - overlapping fixed-size word windows with character offsets
//! - [`EmbeddingProvider`] - sentence-embedding backends: a local
//!   sentence-transformer (`sentence::SentenceEmbedder`, feature `fastembed`),
//!   [`openai::OpenAIEmbeddingProvider`], and the lexical [`HashingEmbedder`]
//!   for tests
//! - [`VectorIndex`] - exact cosine search, batch-built, snapshot to JSON
//!
//! Answering runs a fixed four-stage composition:
//!
//! - [`Retriever`] - embed the query and take the top-K passages
//! - [`PromptAssembler`] - fit tagged passages into the context budget
//! - [`Generator`] - call a [`LanguageModel`] with timeout and bounded retry
//! - [`Answer`] - the explanation plus the exact passages it was built from
//!
//! [`RagPipeline`] owns all of it for one session.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medsimplify_rag::{Document, Generator, RagPipeline};
//! use medsimplify_rag::groq::ChatCompletionsModel;
//! use medsimplify_rag::sentence::SentenceEmbedder;
//!
//! let mut pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(SentenceEmbedder::load(None).await?))
//!     .generator(Generator::new(Arc::new(ChatCompletionsModel::from_env()?)))
//!     .build()?;
//!
//! pipeline.ingest(&[Document::from_extracted("discharge.pdf", &text)]).await?;
//! let answer = pipeline.answer("The patient suffers from pleural effusion.").await?;
//! println!("{}", answer.explanation);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod groq;
pub mod hashing;
pub mod index;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
#[cfg(feature = "fastembed")]
pub mod sentence;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{MIN_CONTEXT_CHARS, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
pub use generation::{Answer, Generator, LanguageModel, RetryPolicy};
pub use hashing::HashingEmbedder;
pub use index::{IndexEntry, VectorIndex};
pub use pipeline::{IngestReport, RagPipeline, RagPipelineBuilder};
pub use prompt::{ContextEntry, GenerationRequest, PromptAssembler};
pub use retriever::{DEFAULT_TOP_K, MAX_TOP_K, Retriever};
