//! # docqa-rag
//!
//! Retrieval-augmented question answering over a document collection.
//!
//! Documents are split into overlapping character windows, embedded in one
//! batch, and stored in a [`VectorIndex`] that is persisted as a versioned
//! snapshot. Questions are embedded, matched against the index by cosine
//! similarity, and answered by a generation model instructed to use only the
//! retrieved context.
//!
//! ## Features
//!
//! - `gemini` (default): [`gemini::GeminiEmbeddingProvider`] and
//!   [`gemini::GeminiAnswerGenerator`] over the Gemini REST API.
//! - `pdf` (default): PDF text extraction in [`loader`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{RagConfig, RagPipeline};
//! use docqa_rag::gemini::{GeminiAnswerGenerator, GeminiClient, GeminiEmbeddingProvider};
//!
//! let config = RagConfig::default();
//! let client = GeminiClient::from_env()?;
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(GeminiEmbeddingProvider::new(client.clone())))
//!     .answer_generator(Arc::new(GeminiAnswerGenerator::from_config(client, &config)))
//!     .config(config)
//!     .build()?;
//!
//! pipeline.ingest_paths(&["guide.pdf"]).await?;
//! let response = pipeline.query("How do I reset the device?", None).await?;
//! println!("{}", response.answer.text);
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod retry;

pub use answer::{AnswerGenerator, build_prompt};
pub use chunking::{Chunker, FixedSizeChunker, TextSpan, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Answer, Chunk, Document, IndexEntry, IngestReport, NO_ANSWER_SENTINEL, QueryResponse,
    SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::VectorIndex;
pub use pipeline::{PipelineState, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use retry::RetryPolicy;
