//! Property tests for vector index search ordering, plus snapshot behaviour.

use std::collections::HashMap;

use medsimplify_rag::{Chunk, HashingEmbedder, IndexEntry, RagError, VectorIndex};
use proptest::prelude::*;

const DIM: usize = 8;

fn chunk(position: usize) -> Chunk {
    Chunk {
        id: format!("doc_{position}"),
        document_id: "doc".to_string(),
        start_offset: position * 10,
        end_offset: position * 10 + 10,
        text: format!("passage {position}"),
        metadata: HashMap::new(),
    }
}

fn entries(vectors: Vec<Vec<f32>>) -> Vec<IndexEntry> {
    vectors
        .into_iter()
        .enumerate()
        .map(|(i, embedding)| IndexEntry { chunk: chunk(i), embedding })
        .collect()
}

fn position(id: &str) -> usize {
    id.trim_start_matches("doc_").parse().unwrap()
}

/// Vectors drawn from a tiny value set so equal scores are common.
fn arb_vector() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(prop_oneof![Just(-1.0f32), Just(0.0f32), Just(1.0f32)], DIM)
}

mod prop_index_search {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Search returns min(k, N) entries in descending score order, and
        /// equal scores keep insertion order.
        #[test]
        fn results_are_bounded_ranked_and_stable(
            vectors in proptest::collection::vec(arb_vector(), 0..30),
            query in arb_vector(),
            k in 1usize..40,
        ) {
            let n = vectors.len();
            let index = VectorIndex::build("test-model", DIM, entries(vectors)).unwrap();
            let results = index.search(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(n));
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(position(&pair[0].chunk.id) < position(&pair[1].chunk.id));
                }
            }
        }

        /// Scores are cosine similarities, whatever the input vector lengths.
        #[test]
        fn scores_are_cosine(
            vectors in proptest::collection::vec(
                proptest::collection::vec(-10.0f32..10.0, DIM), 1..10),
            query in proptest::collection::vec(-10.0f32..10.0, DIM),
        ) {
            let index = VectorIndex::build("test-model", DIM, entries(vectors)).unwrap();
            for result in index.search(&query, 10).unwrap() {
                prop_assert!(result.score <= 1.0 + 1e-4);
                prop_assert!(result.score >= -1.0 - 1e-4);
            }
        }
    }
}

#[test]
fn empty_index_returns_nothing() {
    let index = VectorIndex::build("test-model", DIM, Vec::new()).unwrap();
    assert!(index.is_empty());
    assert!(index.search(&[1.0; DIM], 5).unwrap().is_empty());
}

#[test]
fn identical_vectors_rank_by_insertion_order() {
    let index = VectorIndex::build("test-model", 2, entries(vec![vec![1.0, 0.0]; 4])).unwrap();
    let ids: Vec<String> =
        index.search(&[1.0, 0.0], 4).unwrap().into_iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, ["doc_0", "doc_1", "doc_2", "doc_3"]);
}

#[test]
fn mixed_dimensions_are_rejected() {
    let err = VectorIndex::build("test-model", 3, entries(vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]))
        .unwrap_err();
    assert!(matches!(err, RagError::IndexCorrupted(_)));
}

#[test]
fn query_of_the_wrong_dimension_is_rejected() {
    let index = VectorIndex::build("test-model", 2, entries(vec![vec![1.0, 0.0]])).unwrap();
    assert!(matches!(index.search(&[1.0, 0.0, 0.0], 1), Err(RagError::IndexCorrupted(_))));
}

#[test]
fn snapshot_round_trips_for_the_same_model() {
    let embedder = HashingEmbedder::new(DIM);
    let mut first = vec![0.0; DIM];
    first[0] = 1.0;
    let mut second = vec![0.0; DIM];
    second[1] = -1.0;
    // unit vectors, so re-normalising on load is exact
    let index = VectorIndex::build(
        medsimplify_rag::EmbeddingProvider::model_id(&embedder),
        DIM,
        entries(vec![first, second]),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    index.save(&path).unwrap();

    let loaded = VectorIndex::load(&path, &embedder).unwrap();
    assert_eq!(loaded, index);
}

#[test]
fn snapshot_from_another_model_is_refused() {
    let index = VectorIndex::build("other-model", DIM, entries(vec![vec![1.0; DIM]])).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    index.save(&path).unwrap();

    let err = VectorIndex::load(&path, &HashingEmbedder::new(DIM)).unwrap_err();
    assert!(matches!(err, RagError::IndexCorrupted(_)));
}

#[test]
fn missing_snapshot_is_a_snapshot_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = VectorIndex::load(dir.path().join("absent.json"), &HashingEmbedder::new(DIM))
        .unwrap_err();
    assert!(matches!(err, RagError::Snapshot(_)));
}
