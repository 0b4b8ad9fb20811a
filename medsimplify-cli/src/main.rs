mod args;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use medsimplify_rag::groq::ChatCompletionsModel;
use medsimplify_rag::openai::OpenAIEmbeddingProvider;
use medsimplify_rag::sentence::SentenceEmbedder;
use medsimplify_rag::{
    Document, EmbeddingProvider, Generator, HashingEmbedder, RagPipeline, RetryPolicy, VectorIndex,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, EmbedderKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.rag_config()?;
    let embedder = build_embedder(&args).await?;

    let Some(api_key) = args.api_key.clone() else {
        bail!("no API key for the chat model: set GROQ_API_KEY or pass --api-key");
    };
    let model = ChatCompletionsModel::new(api_key)?
        .with_base_url(&args.base_url)
        .with_model(&args.model)
        .with_temperature(args.temperature);
    let retry = RetryPolicy { max_attempts: args.max_attempts, ..RetryPolicy::default() };
    let generator = Generator::new(Arc::new(model))
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_retry(retry);

    let mut pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .generator(generator)
        .build()?;

    if let Some(path) = &args.load_index {
        let index = VectorIndex::load(path, embedder.as_ref())
            .with_context(|| format!("loading index from {}", path.display()))?;
        info!(path = %path.display(), chunk_count = index.len(), "loaded index snapshot");
        pipeline.replace_index(index)?;
    } else {
        let documents = read_documents(&args)?;
        let report = pipeline.ingest(&documents).await.context("ingesting documents")?;
        info!(documents = report.documents, chunk_count = report.chunks, "ingestion complete");
    }

    if let Some(path) = &args.save_index {
        pipeline.index().save(path)?;
    }

    let answer = pipeline.answer(&args.query).await.context("generating explanation")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", output::render_answer(&answer));
    }
    Ok(())
}

async fn build_embedder(args: &Args) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match args.embedder {
        EmbedderKind::Sentence => Arc::new(
            SentenceEmbedder::load(args.model_cache_dir.clone())
                .await
                .context("loading the sentence embedding model")?,
        ),
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(args.embedding_dimensions.unwrap_or(512))),
        EmbedderKind::Openai => {
            let Some(api_key) = args.embedding_api_key.clone() else {
                bail!(
                    "no API key for the embedding model: set OPENAI_API_KEY or pass --embedding-api-key"
                );
            };
            Arc::new(
                OpenAIEmbeddingProvider::new(api_key)?
                    .with_base_url(&args.embedding_base_url)
                    .with_model(&args.embedding_model)
                    .with_expected_dimensions(args.embedding_dimensions.unwrap_or(1536)),
            )
        }
    };
    Ok(embedder)
}

/// Read every `--doc` file as already-extracted text.
fn read_documents(args: &Args) -> anyhow::Result<Vec<Document>> {
    args.docs
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Document::from_extracted(id, &text))
        })
        .collect()
}
