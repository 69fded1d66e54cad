//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates two flows over an explicitly owned index:
//!
//! - **ingest**: load → chunk → embed (one batch) → build a fresh
//!   [`VectorIndex`] → save it → swap it in as the current snapshot;
//! - **query**: current snapshot (loaded lazily from disk) → retrieve →
//!   answer.
//!
//! The current snapshot is an `Arc<VectorIndex>` behind a `RwLock`. Ingest
//! builds the replacement in isolation and only swaps the pointer once it is
//! saved, so a query never sees a partially built index and a failed ingest
//! leaves the previous snapshot untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .answer_generator(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.ingest(&documents).await?;
//! let response = pipeline.query("What color is the sky?", None).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::answer::AnswerGenerator;
use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{
    Answer, Chunk, Document, IndexEntry, IngestReport, QueryResponse, SearchResult,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::loader;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;

/// Whether a pipeline has a published index to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No snapshot in memory or on disk.
    Empty,
    /// A snapshot is available.
    Indexed {
        /// Number of entries in the snapshot.
        entries: usize,
        /// Dimensionality of the snapshot.
        dimensions: usize,
    },
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    answer_generator: Arc<dyn AnswerGenerator>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    retry: RetryPolicy,
    current: RwLock<Option<Arc<VectorIndex>>>,
    ingest_lock: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Directory the snapshot is persisted to.
    pub fn index_dir(&self) -> &Path {
        &self.config.index_dir
    }

    /// Report whether a snapshot is available, loading it from disk if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupt`] if the persisted snapshot is unreadable.
    pub async fn state(&self) -> Result<PipelineState> {
        match self.current_index().await {
            Ok(index) => Ok(PipelineState::Indexed {
                entries: index.len(),
                dimensions: index.dimensions().unwrap_or_default(),
            }),
            Err(RagError::IndexNotFound { .. }) => Ok(PipelineState::Empty),
            Err(e) => Err(e),
        }
    }

    /// Load documents from `paths` and ingest them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentLoad`] for an unreadable source, otherwise
    /// as [`ingest`](Self::ingest).
    pub async fn ingest_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestReport> {
        info!(stage = "loading", source_count = paths.len(), "ingest started");
        let documents = loader::load_paths(paths).await?;
        self.ingest(&documents).await
    }

    /// Rebuild the index from `documents`: chunk → embed → save → publish.
    ///
    /// The new snapshot replaces the previous one entirely. Nothing is
    /// published unless every step succeeds.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if the documents contain no text.
    /// - [`RagError::EmbeddingService`] if embedding fails twice.
    /// - [`RagError::DimensionMismatch`] if a returned vector's length differs
    ///   from the provider's declared [`dimensions`](EmbeddingProvider::dimensions).
    /// - [`RagError::Storage`] if the snapshot cannot be written.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;

        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        info!(
            stage = "chunking",
            document_count = documents.len(),
            chunk_count = chunks.len(),
            "documents chunked"
        );
        if chunks.is_empty() {
            return Err(RagError::InvalidParameter("documents contain no text to index".into()));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let provider = &self.embedding_provider;
        let embeddings = self
            .retry
            .run("embed_batch", || provider.embed_batch(&texts))
            .await
            .inspect_err(|e| error!(stage = "embedding", error = %e, "ingest aborted"))?;

        if embeddings.len() != chunks.len() {
            error!(
                stage = "embedding",
                expected = chunks.len(),
                actual = embeddings.len(),
                "embedding count mismatch, ingest aborted"
            );
            return Err(RagError::EmbeddingService {
                provider: provider.model_id().to_string(),
                message: format!(
                    "returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        let declared = provider.dimensions();
        if let Some(actual) = embeddings.iter().map(Vec::len).find(|&len| len != declared) {
            error!(
                stage = "embedding",
                expected = declared,
                actual,
                "embedding length differs from provider dimensions, ingest aborted"
            );
            return Err(RagError::DimensionMismatch { expected: declared, actual });
        }

        let entries: Vec<IndexEntry> = embeddings
            .into_iter()
            .zip(chunks)
            .map(|(embedding, chunk)| IndexEntry { embedding, chunk })
            .collect();

        let mut index = VectorIndex::new();
        index.add(entries)?;
        index
            .save(&self.config.index_dir)
            .await
            .inspect_err(|e| error!(stage = "indexing", error = %e, "ingest aborted"))?;

        let report = IngestReport {
            document_count: documents.len(),
            entry_count: index.len(),
            dimensions: index.dimensions().unwrap_or_default(),
        };
        *self.current.write().await = Some(Arc::new(index));

        info!(
            stage = "indexed",
            document_count = report.document_count,
            entry_count = report.entry_count,
            dimensions = report.dimensions,
            "ingest completed"
        );
        Ok(report)
    }

    /// Retrieve the `k` (default `top_k`) chunks most similar to `query`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if `k == 0`.
    /// - [`RagError::IndexNotFound`] / [`RagError::IndexCorrupt`] if no valid
    ///   snapshot is available.
    /// - Whatever the embedding provider or index search returns.
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<SearchResult>> {
        let k = self.resolve_k(k)?;
        let index = self.current_index().await?;
        self.retriever.retrieve(&index, query, k).await
    }

    /// Answer `question` from the `k` (default `top_k`) best matching chunks.
    ///
    /// A "not available in context" answer is a normal result, see
    /// [`Answer::is_no_answer`].
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if `question` is blank or `k == 0`.
    /// - [`RagError::IndexNotFound`] if no ingest has completed.
    /// - [`RagError::EmbeddingService`] / [`RagError::GenerationService`] if a
    ///   service call fails twice.
    pub async fn query(&self, question: &str, k: Option<usize>) -> Result<QueryResponse> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidParameter("question must not be empty".into()));
        }
        let k = self.resolve_k(k)?;
        let index = self.current_index().await?;

        let sources = self
            .retriever
            .retrieve(&index, question, k)
            .await
            .inspect_err(|e| error!(stage = "retrieving", error = %e, "query failed"))?;

        let context: Vec<Chunk> = sources.iter().map(|r| r.chunk.clone()).collect();
        let generator = &self.answer_generator;
        let text = self
            .retry
            .run("answer", || generator.answer(question, &context))
            .await
            .inspect_err(|e| error!(stage = "answering", error = %e, "query failed"))?;

        let answer = Answer { text };
        info!(
            stage = "answered",
            source_count = sources.len(),
            no_answer = answer.is_no_answer(),
            "query completed"
        );
        Ok(QueryResponse { answer, sources })
    }

    fn resolve_k(&self, k: Option<usize>) -> Result<usize> {
        match k.unwrap_or(self.config.top_k) {
            0 => Err(RagError::InvalidParameter("k must be greater than zero".into())),
            k => Ok(k),
        }
    }

    /// The published snapshot, loading it from `index_dir` on first use.
    async fn current_index(&self) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }

        let loaded = Arc::new(VectorIndex::load(&self.config.index_dir).await?);
        let mut current = self.current.write().await;
        // An ingest may have published while we were loading; it wins.
        let index = current.get_or_insert(loaded);
        Ok(Arc::clone(index))
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `answer_generator` are required. The
/// chunker defaults to a [`FixedSizeChunker`] using the configured sizes.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .answer_generator(Arc::new(generator))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the answer generator.
    pub fn answer_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.answer_generator = Some(generator);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if the config is invalid or a
    /// required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self
            .config
            .ok_or_else(|| RagError::InvalidParameter("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidParameter("embedding_provider is required".to_string())
        })?;
        let answer_generator = self.answer_generator.ok_or_else(|| {
            RagError::InvalidParameter("answer_generator is required".to_string())
        })?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        let retry = RetryPolicy::new(config.retry_backoff());
        let retriever = Retriever::new(Arc::clone(&embedding_provider), retry);

        Ok(RagPipeline {
            config,
            embedding_provider,
            answer_generator,
            chunker,
            retriever,
            retry,
            current: RwLock::new(None),
            ingest_lock: Mutex::new(()),
        })
    }
}
