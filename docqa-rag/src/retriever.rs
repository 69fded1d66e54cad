//! Query-side retrieval: embed the question, then search an index.

use std::sync::Arc;

use tracing::debug;

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::retry::RetryPolicy;

/// Composes an [`EmbeddingProvider`] with [`VectorIndex::search`].
///
/// Errors from either step are returned unchanged.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
}

impl Retriever {
    /// Create a retriever that embeds queries with `embedding_provider`.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, retry: RetryPolicy) -> Self {
        Self { embedding_provider, retry }
    }

    /// Return the `k` chunks of `index` most similar to `query`.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let provider = &self.embedding_provider;
        let query_embedding = self.retry.run("embed_query", || provider.embed(query)).await?;

        let results = index.search(&query_embedding, k)?;
        debug!(
            k,
            result_count = results.len(),
            top_score = ?results.first().map(|r| r.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}
