//! Data types for documents, chunks, index entries and results.

use serde::{Deserialize, Serialize};

/// The fixed answer text that means "the context does not contain the answer".
pub const NO_ANSWER_SENTINEL: &str = "Answer is not available in context";

/// A source document made of ordered pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Raw text of each page, in order.
    pub pages: Vec<String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a single-page document.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), pages: vec![text.into()], source_uri: None }
    }

    /// Create a document from its pages.
    pub fn from_pages(id: impl Into<String>, pages: Vec<String>) -> Self {
        Self { id: id.into(), pages, source_uri: None }
    }

    /// Attach the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    /// The concatenated document text; pages are joined with a newline.
    pub fn text(&self) -> String {
        self.pages.join("\n")
    }
}

/// A bounded window of a [`Document`]'s text.
///
/// `start` and `end` are character offsets (not bytes) into
/// [`Document::text`], with `end` exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this chunk within its document.
    pub index: usize,
    /// First character covered.
    pub start: usize,
    /// One past the last character covered.
    pub end: usize,
    /// The text content of the chunk.
    pub text: String,
}

/// A chunk paired with its embedding; the unit stored by the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The vector embedding of `chunk.text`.
    pub embedding: Vec<f32>,
    /// The embedded chunk.
    pub chunk: Chunk,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
}

/// Text produced by the answer generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generated text, passed through unchanged.
    pub text: String,
}

impl Answer {
    /// Whether the generator reported that the context held no answer.
    pub fn is_no_answer(&self) -> bool {
        self.text.trim().trim_end_matches('.') == NO_ANSWER_SENTINEL
    }
}

/// Result of the query flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: Answer,
    /// The chunks the answer was generated from, best first.
    pub sources: Vec<SearchResult>,
}

/// Summary of a completed ingest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of documents that were chunked.
    pub document_count: usize,
    /// Number of entries in the published index.
    pub entry_count: usize,
    /// Dimensionality of the published index.
    pub dimensions: usize,
}
