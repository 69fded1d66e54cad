//! Property tests for fixed-size chunking.

use docqa_rag::chunking::{Chunker, FixedSizeChunker, chunk_text};
use docqa_rag::document::Document;
use docqa_rag::error::RagError;
use proptest::prelude::*;

/// Rebuild the source text by dropping the declared overlap from every chunk
/// after the first.
fn reassemble(texts: &[&str], overlap: usize) -> String {
    let mut out = String::new();
    for (i, text) in texts.iter().enumerate() {
        if i == 0 {
            out.push_str(text);
        } else {
            out.extend(text.chars().skip(overlap));
        }
    }
    out
}

/// Chunk size and a strictly smaller overlap.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Property: chunks reconstruct the source text**
/// *For any* text and valid `(L, O)`, concatenating the chunks with the
/// overlap removed SHALL reproduce the text exactly, every chunk SHALL be at
/// most `L` characters, and consecutive chunks SHALL share exactly `O`
/// characters.
mod prop_chunk_reconstruction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_cover_text_with_declared_overlap(
            text in "[a-zA-Z0-9 .,\n]{0,300}",
            (size, overlap) in arb_params(),
        ) {
            let spans = chunk_text(&text, size, overlap).unwrap();
            let texts: Vec<&str> = spans.iter().map(|s| s.text).collect();

            prop_assert_eq!(reassemble(&texts, overlap), text.clone());

            for span in &spans {
                prop_assert!(span.end - span.start <= size);
                prop_assert_eq!(span.text.chars().count(), span.end - span.start);
            }
            for pair in spans.windows(2) {
                prop_assert_eq!(pair[0].end - pair[1].start, overlap);
            }
            if let Some(last) = spans.last() {
                prop_assert_eq!(last.end, text.chars().count());
            }
        }

        #[test]
        fn multibyte_text_splits_on_char_boundaries(
            text in "[αβγ日本語🦀a-c ]{0,120}",
            (size, overlap) in arb_params(),
        ) {
            let spans = chunk_text(&text, size, overlap).unwrap();
            let texts: Vec<&str> = spans.iter().map(|s| s.text).collect();
            prop_assert_eq!(reassemble(&texts, overlap), text.clone());
        }

        #[test]
        fn overlap_not_less_than_size_is_rejected(size in 0usize..50, extra in 0usize..50) {
            let overlap = size + extra;
            let result = chunk_text("some text", size, overlap);
            prop_assert!(matches!(result, Err(RagError::InvalidParameter(_))));
        }
    }
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(chunk_text("", 10, 2).unwrap().is_empty());

    let chunker = FixedSizeChunker::new(10, 2).unwrap();
    assert!(chunker.chunk(&Document::new("empty", "")).is_empty());
}

#[test]
fn zero_chunk_size_is_rejected() {
    assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::InvalidParameter(_))));
}

#[test]
fn windows_advance_by_size_minus_overlap() {
    let spans = chunk_text("abcdefghij", 4, 1).unwrap();
    let texts: Vec<&str> = spans.iter().map(|s| s.text).collect();
    assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
}

#[test]
fn last_chunk_covers_the_remainder() {
    let spans = chunk_text("abcdefgh", 5, 0).unwrap();
    let texts: Vec<&str> = spans.iter().map(|s| s.text).collect();
    assert_eq!(texts, vec!["abcde", "fgh"]);
    assert_eq!((spans[1].start, spans[1].end), (5, 8));
}

#[test]
fn chunker_is_deterministic_and_labels_chunks() {
    let doc = Document::from_pages("manual", vec!["first page".into(), "second page".into()]);
    let chunker = FixedSizeChunker::new(8, 3).unwrap();

    let first = chunker.chunk(&doc);
    let second = chunker.chunk(&doc);
    assert_eq!(first, second);

    for (i, chunk) in first.iter().enumerate() {
        assert_eq!(chunk.id, format!("manual_{i}"));
        assert_eq!(chunk.document_id, "manual");
        assert_eq!(chunk.index, i);
    }
    let texts: Vec<&str> = first.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(reassemble(&texts, 3), "first page\nsecond page");
}
