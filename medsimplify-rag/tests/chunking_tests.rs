//! Property and scenario tests for fixed-size chunking.

use medsimplify_rag::{Chunker, Document, FixedSizeChunker};
use proptest::prelude::*;

/// Rebuild the document from its chunks by skipping each chunk's overlap
/// with the previous one.
fn reconstruct(chunks: &[medsimplify_rag::Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0;
    for chunk in chunks {
        let skip = covered - chunk.start_offset;
        out.extend(chunk.text.chars().skip(skip));
        covered = chunk.end_offset;
    }
    out
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

mod prop_chunk_tiling {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Chunks tile the document: no gaps, overlaps only inside the window,
        /// and stripping overlaps gives back the exact text.
        #[test]
        fn chunks_reconstruct_the_document(
            text in "[a-zé.,\\n\\t ]{0,400}",
            chunk_size in 1usize..25,
            overlap_seed in 0usize..25,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunker = FixedSizeChunker::new(chunk_size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start_offset, 0);
            prop_assert_eq!(chunks.last().unwrap().end_offset, text.chars().count());

            for chunk in &chunks {
                let expected: String = text
                    .chars()
                    .skip(chunk.start_offset)
                    .take(chunk.char_len())
                    .collect();
                prop_assert_eq!(&chunk.text, &expected);
                prop_assert!(word_count(&chunk.text) <= chunk_size);
            }

            for pair in chunks.windows(2) {
                // next chunk starts inside (or right at the end of) the previous one
                prop_assert!(pair[1].start_offset <= pair[0].end_offset);
                prop_assert!(pair[1].start_offset > pair[0].start_offset);
                let shared: String = text
                    .chars()
                    .skip(pair[1].start_offset)
                    .take(pair[0].end_offset - pair[1].start_offset)
                    .collect();
                prop_assert_eq!(word_count(&shared), overlap);
            }

            prop_assert_eq!(reconstruct(&chunks), text);
        }

        #[test]
        fn chunking_is_deterministic(
            text in "[a-z ]{0,200}",
            chunk_size in 2usize..10,
        ) {
            let chunker = FixedSizeChunker::new(chunk_size, 1).unwrap();
            let doc = Document::new("doc", text);
            prop_assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
        }
    }
}

#[test]
fn five_hundred_words_make_three_overlapping_chunks() {
    let mut words = vec!["Hypertension", "is", "high", "blood", "pressure."];
    while words.len() < 500 {
        words.push("filler");
    }
    let text = words.join(" ");

    let chunker = FixedSizeChunker::new(200, 50).unwrap();
    let chunks = chunker.chunk(&Document::new("bp.pdf", text.clone()));

    assert_eq!(chunks.len(), 3);
    assert!(chunks[0].text.starts_with("Hypertension is high blood pressure."));
    for pair in chunks.windows(2) {
        let shared: String = text
            .chars()
            .skip(pair[1].start_offset)
            .take(pair[0].end_offset - pair[1].start_offset)
            .collect();
        assert_eq!(word_count(&shared), 50);
    }
    assert_eq!(reconstruct(&chunks), text);
}

#[test]
fn document_shorter_than_a_chunk_is_kept_whole() {
    let chunker = FixedSizeChunker::new(200, 50).unwrap();
    let chunks = chunker.chunk(&Document::new("short", "Angina is chest pain."));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Angina is chest pain.");
}
