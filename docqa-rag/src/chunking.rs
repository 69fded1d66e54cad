//! Document chunking.
//!
//! [`chunk_text`] splits text into fixed-size character windows with a fixed
//! overlap; [`FixedSizeChunker`] applies it to a [`Document`] and produces
//! [`Chunk`]s ready for embedding.
//!
//! Windows are measured in characters, not bytes, so multi-byte text is
//! never split inside a UTF-8 sequence.

use std::iter;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations must be deterministic and return an empty `Vec` for a
/// document with empty text.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// A window of a source text, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// First character covered.
    pub start: usize,
    /// One past the last character covered.
    pub end: usize,
    /// The covered text.
    pub text: &'a str,
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidParameter("chunk_size must be greater than zero".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidParameter(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Split `text` into windows of `chunk_size` characters whose start advances
/// by `chunk_size - chunk_overlap`.
///
/// The last window may be shorter. Splitting stops as soon as a window
/// reaches the end of the text, so consecutive windows always share exactly
/// `chunk_overlap` characters.
///
/// # Errors
///
/// Returns [`RagError::InvalidParameter`] if `chunk_size == 0` or
/// `chunk_overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<TextSpan<'_>>> {
    validate(chunk_size, chunk_overlap)?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every character, plus the end of the text.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = chunk_size - chunk_overlap;

    let mut spans = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        spans.push(TextSpan { start, end, text: &text[boundaries[start]..boundaries[end]] });
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(spans)
}

/// Splits text into fixed-size chunks by character count with a fixed overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 100)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text();
        // Parameters were validated in `new`.
        let spans = chunk_text(&text, self.chunk_size, self.chunk_overlap).unwrap_or_default();

        spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk {
                id: format!("{}_{index}", document.id),
                document_id: document.id.clone(),
                index,
                start: span.start,
                end: span.end,
                text: span.text.to_string(),
            })
            .collect()
    }
}
