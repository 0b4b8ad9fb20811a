//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use medsimplify_rag::RagConfig;

/// Explain medical text in plain language, grounded in your own documents.
#[derive(Debug, Parser)]
#[command(name = "medsimplify", version, about)]
pub struct Args {
    /// Medical text or question to explain.
    pub query: String,

    /// Extracted plain-text document to ground the answer in (repeatable).
    #[arg(short, long = "doc", value_name = "FILE")]
    pub docs: Vec<PathBuf>,

    /// Words per chunk.
    #[arg(long, default_value_t = RagConfig::default().chunk_size)]
    pub chunk_size: usize,

    /// Words shared by consecutive chunks.
    #[arg(long, default_value_t = RagConfig::default().chunk_overlap)]
    pub chunk_overlap: usize,

    /// Number of passages to retrieve.
    #[arg(short = 'k', long, default_value_t = RagConfig::default().top_k)]
    pub top_k: usize,

    /// Character budget for the retrieved context.
    #[arg(long, default_value_t = RagConfig::default().max_context_chars)]
    pub max_context_chars: usize,

    /// Embedding backend.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Sentence)]
    pub embedder: EmbedderKind,

    /// Directory for downloaded sentence-model files.
    #[arg(long, env = "MEDSIMPLIFY_MODEL_CACHE", value_name = "DIR")]
    pub model_cache_dir: Option<PathBuf>,

    /// Dimensions of the hashing or openai vectors [default: 512 for hashing, 1536 for openai].
    #[arg(long)]
    pub embedding_dimensions: Option<usize>,

    /// Embedding model name (OpenAI-compatible backend).
    #[arg(long, env = "MEDSIMPLIFY_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Base URL of the OpenAI-compatible embeddings server.
    #[arg(long, env = "MEDSIMPLIFY_EMBEDDING_URL", default_value = medsimplify_rag::openai::OPENAI_API_BASE)]
    pub embedding_base_url: String,

    /// API key for the embeddings server.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Chat model used for the explanation.
    #[arg(long, env = "MEDSIMPLIFY_MODEL", default_value = medsimplify_rag::groq::DEFAULT_CHAT_MODEL)]
    pub model: String,

    /// Base URL of the OpenAI-compatible chat completions server.
    #[arg(long, env = "MEDSIMPLIFY_BASE_URL", default_value = medsimplify_rag::groq::GROQ_API_BASE)]
    pub base_url: String,

    /// API key for the chat completions server.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    #[arg(long, default_value_t = medsimplify_rag::groq::DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Seconds to wait for each generation attempt.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Total generation attempts for transient failures.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Write the built index to this file.
    #[arg(long, value_name = "PATH")]
    pub save_index: Option<PathBuf>,

    /// Load a previously saved index instead of ingesting documents.
    #[arg(long, value_name = "PATH", conflicts_with = "docs")]
    pub load_index: Option<PathBuf>,

    /// Print the answer as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Available embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Local all-MiniLM-L6-v2 sentence-transformer, downloaded on first use.
    Sentence,
    /// Lexical feature hashing; no download, no semantic matching.
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    Openai,
}

impl Args {
    /// Pipeline configuration from the chunking and retrieval flags.
    pub fn rag_config(&self) -> medsimplify_rag::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .max_context_chars(self.max_context_chars)
            .build()
    }
}
