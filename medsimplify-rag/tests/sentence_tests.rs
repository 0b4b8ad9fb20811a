//! Semantic retrieval with the local sentence-transformer model.
//!
//! These tests download `all-MiniLM-L6-v2` on first run:
//! `cargo test -p medsimplify-rag --features fastembed -- --ignored`

#![cfg(feature = "fastembed")]

use medsimplify_rag::sentence::{DEFAULT_SENTENCE_MODEL, SentenceEmbedder};
use medsimplify_rag::{Chunk, EmbeddingProvider, IndexEntry, VectorIndex};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

fn chunk(document_id: &str, text: &str) -> Chunk {
    Chunk {
        id: format!("{document_id}_0"),
        document_id: document_id.to_string(),
        start_offset: 0,
        end_offset: text.chars().count(),
        text: text.to_string(),
        metadata: Default::default(),
    }
}

#[tokio::test]
#[ignore] // downloads the model
async fn model_identity_is_recorded() {
    let embedder = SentenceEmbedder::load(None).await.unwrap();
    assert_eq!(embedder.model_id(), DEFAULT_SENTENCE_MODEL);
    assert_eq!(embedder.dimensions(), 384);

    let a = embedder.embed("Pleural effusion is fluid around the lungs.").await.unwrap();
    let b = embedder.embed("Pleural effusion is fluid around the lungs.").await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
#[ignore] // downloads the model
async fn paraphrases_are_closer_than_unrelated_text() {
    let embedder = SentenceEmbedder::load(None).await.unwrap();
    let vectors = embedder
        .embed_batch(&[
            "Hypertension damages arteries over time.",
            "high blood pressure",
            "The fracture was set in a plaster cast.",
        ])
        .await
        .unwrap();

    let related = cosine(&vectors[0], &vectors[1]);
    let unrelated = cosine(&vectors[2], &vectors[1]);
    assert!(related > 0.3, "related score {related}");
    assert!(related > unrelated, "{related} <= {unrelated}");
}

#[tokio::test]
#[ignore] // downloads the model
async fn synonym_query_retrieves_its_passage() {
    let embedder = SentenceEmbedder::load(None).await.unwrap();
    let texts = [
        "Hypertension damages arteries over time.",
        "Take the antibiotic with food twice a day.",
        "The fracture was set in a plaster cast.",
    ];
    let embeddings = embedder.embed_batch(&texts).await.unwrap();
    let entries = texts
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, embedding))| IndexEntry { chunk: chunk(&format!("doc{i}"), text), embedding })
        .collect();
    let index = VectorIndex::build(embedder.model_id(), embedder.dimensions(), entries).unwrap();

    let query = embedder.embed("high blood pressure").await.unwrap();
    let results = index.search(&query, 1).unwrap();
    assert_eq!(results[0].chunk.document_id, "doc0");
}
