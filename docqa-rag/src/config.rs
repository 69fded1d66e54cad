//! Configuration for the RAG pipeline.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default embedding model (768-dimensional).
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";

/// Dimensionality of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// Default answer generation model.
pub const DEFAULT_ANSWER_MODEL: &str = "gemini-2.0-flash";

/// Configuration parameters for the RAG pipeline.
///
/// Every field has a default, so a partial JSON file deserializes into a
/// complete config. Call [`RagConfig::validate`] (or build through
/// [`RagConfig::builder`]) before handing it to a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters (`L`).
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks (`O`).
    pub chunk_overlap: usize,
    /// Number of top results to retrieve when the caller gives no `k`.
    pub top_k: usize,
    /// Identifier of the embedding model.
    pub embedding_model_id: String,
    /// Length of the vectors the embedding model produces.
    pub embedding_dimensions: usize,
    /// Identifier of the answer generation model.
    pub answer_model_id: String,
    /// Sampling temperature for answer generation.
    pub generation_temperature: f32,
    /// Upper bound on generated answer length, in tokens.
    pub max_output_tokens: u32,
    /// Directory holding the persisted index snapshot.
    pub index_dir: PathBuf,
    /// Delay before the single retry of a failed service call.
    pub retry_backoff_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 5,
            embedding_model_id: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            answer_model_id: DEFAULT_ANSWER_MODEL.to_string(),
            generation_temperature: 0.3,
            max_output_tokens: 500,
            index_dir: PathBuf::from("docqa_index"),
            retry_backoff_ms: 1000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Read a config from a JSON file. Missing fields take their defaults.
    ///
    /// The result is validated before being returned.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RagError::InvalidParameter(format!("cannot read config '{}': {e}", path.display()))
        })?;
        let config: RagConfig = serde_json::from_str(&raw).map_err(|e| {
            RagError::InvalidParameter(format!("cannot parse config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Backoff before retrying a failed service call.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Check that all parameters are in range.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - either model id is blank
    /// - `embedding_dimensions == 0`
    /// - `generation_temperature` is outside `[0.0, 2.0]`
    /// - `max_output_tokens == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidParameter("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidParameter(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidParameter("top_k must be greater than zero".into()));
        }
        if self.embedding_model_id.trim().is_empty() {
            return Err(RagError::InvalidParameter("embedding_model_id must not be empty".into()));
        }
        if self.embedding_dimensions == 0 {
            return Err(RagError::InvalidParameter(
                "embedding_dimensions must be greater than zero".into(),
            ));
        }
        if self.answer_model_id.trim().is_empty() {
            return Err(RagError::InvalidParameter("answer_model_id must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.generation_temperature) {
            return Err(RagError::InvalidParameter(format!(
                "generation_temperature ({}) must be within [0.0, 2.0]",
                self.generation_temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(RagError::InvalidParameter(
                "max_output_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Start from an existing config instead of the defaults.
    pub fn from_config(config: RagConfig) -> Self {
        Self { config }
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of results to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model_id(mut self, id: impl Into<String>) -> Self {
        self.config.embedding_model_id = id.into();
        self
    }

    /// Set the dimensionality of the embedding model.
    pub fn embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.config.embedding_dimensions = dimensions;
        self
    }

    /// Set the answer model identifier.
    pub fn answer_model_id(mut self, id: impl Into<String>) -> Self {
        self.config.answer_model_id = id.into();
        self
    }

    /// Set the generation temperature.
    pub fn generation_temperature(mut self, temperature: f32) -> Self {
        self.config.generation_temperature = temperature;
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = tokens;
        self
    }

    /// Set the snapshot directory.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = dir.into();
        self
    }

    /// Set the retry backoff in milliseconds.
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_less_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidParameter(_)));
    }

    #[test]
    fn rejects_zero_chunk_size_and_top_k() {
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn rejects_zero_embedding_dimensions() {
        let err = RagConfig::builder().embedding_dimensions(0).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidParameter(_)));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        assert!(RagConfig::builder().generation_temperature(-0.1).build().is_err());
        assert!(RagConfig::builder().generation_temperature(2.5).build().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docqa.json");
        std::fs::write(&path, r#"{ "chunk_size": 2000, "chunk_overlap": 200 }"#).unwrap();

        let config = RagConfig::from_json_file(&path).unwrap();
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, RagConfig::default().top_k);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docqa.json");
        std::fs::write(&path, r#"{ "chunk_size": 10, "chunk_overlap": 10 }"#).unwrap();

        assert!(matches!(
            RagConfig::from_json_file(&path),
            Err(RagError::InvalidParameter(_))
        ));
    }
}
