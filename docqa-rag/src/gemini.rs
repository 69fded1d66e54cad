//! Gemini embedding provider and answer generator over the Generative
//! Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::answer::{AnswerGenerator, build_prompt};
use crate::config::{
    DEFAULT_ANSWER_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, RagConfig,
};
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Generative Language API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Upper bound on a single HTTP request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Most requests `batchEmbedContents` accepts in one call.
pub const MAX_BATCH_SIZE: usize = 100;

const PROVIDER: &str = "Gemini";

/// Connection settings shared by the embedding and generation clients.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with the given API key and the default base URL.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::InvalidParameter("Gemini API key must not be empty".into()));
        }
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().map_err(|e| {
            RagError::InvalidParameter(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { http, api_key, base_url: GEMINI_BASE_URL.to_string() })
    }

    /// Create a client using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            RagError::InvalidParameter(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        Self::new(api_key)
    }

    /// Point the client at another endpoint (e.g. a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/{model}:{method}", self.base_url)
    }

    /// POST `body` and decode the JSON response, mapping every failure with `fault`.
    async fn post<B, R>(
        &self,
        url: &str,
        body: &B,
        fault: fn(String) -> RagError,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                fault(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(fault(format!("API returned {status}: {detail}")));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            fault(format!("failed to parse response: {e}"))
        })
    }
}

/// Model names are addressed as `models/{id}` by the API.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

fn embedding_fault(message: String) -> RagError {
    RagError::EmbeddingService { provider: PROVIDER.into(), message }
}

fn generation_fault(message: String) -> RagError {
    RagError::GenerationService { provider: PROVIDER.into(), message }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Single texts are embedded as queries (`RETRIEVAL_QUERY`); batches are
/// embedded as documents (`RETRIEVAL_DOCUMENT`), matching how the pipeline
/// calls them. Batches larger than [`MAX_BATCH_SIZE`] are sent as several
/// sequential requests and the results concatenated in input order.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::{GeminiClient, GeminiEmbeddingProvider};
///
/// let provider = GeminiEmbeddingProvider::new(GeminiClient::from_env()?);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider for `models/embedding-001`.
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    /// Set the model name (e.g. `models/text-embedding-004`).
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        self.model = model_path(model.as_ref());
        self
    }

    /// Set the dimensionality reported by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Create a provider using the embedding model and dimensionality of `config`.
    pub fn from_config(client: GeminiClient, config: &RagConfig) -> Self {
        Self::new(client)
            .with_model(&config.embedding_model_id)
            .with_dimensions(config.embedding_dimensions)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let request = EmbedContentRequest {
            model: &self.model,
            content: Content { role: None, parts: vec![Part { text }] },
            task_type: "RETRIEVAL_QUERY",
        };
        let url = self.client.url(&self.model, "embedContent");
        let response: EmbedContentResponse =
            self.client.post(&url, &request, embedding_fault).await?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.client.url(&self.model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            debug!(
                provider = PROVIDER,
                batch_size = batch.len(),
                model = %self.model,
                "embedding batch"
            );

            let request = BatchEmbedContentsRequest {
                requests: batch
                    .iter()
                    .map(|&text| EmbedContentRequest {
                        model: &self.model,
                        content: Content { role: None, parts: vec![Part { text }] },
                        task_type: "RETRIEVAL_DOCUMENT",
                    })
                    .collect(),
            };
            let response: BatchEmbedContentsResponse =
                self.client.post(&url, &request, embedding_fault).await?;

            if response.embeddings.len() != batch.len() {
                return Err(embedding_fault(format!(
                    "returned {} embeddings for a batch of {}",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── AnswerGenerator implementation ─────────────────────────────────

/// An [`AnswerGenerator`] backed by Gemini `generateContent`.
pub struct GeminiAnswerGenerator {
    client: GeminiClient,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiAnswerGenerator {
    /// Create a generator for `gemini-2.0-flash` with temperature 0.3 and a
    /// 500 token limit.
    pub fn new(client: GeminiClient) -> Self {
        let defaults = RagConfig::default();
        Self {
            client,
            model: model_path(DEFAULT_ANSWER_MODEL),
            temperature: defaults.generation_temperature,
            max_output_tokens: defaults.max_output_tokens,
        }
    }

    /// Create a generator using the model and sampling settings of `config`.
    pub fn from_config(client: GeminiClient, config: &RagConfig) -> Self {
        Self {
            client,
            model: model_path(&config.answer_model_id),
            temperature: config.generation_temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl AnswerGenerator for GeminiAnswerGenerator {
    async fn answer(&self, query: &str, context: &[Chunk]) -> Result<String> {
        let prompt = build_prompt(query, context);
        debug!(
            provider = PROVIDER,
            model = %self.model,
            context_chunks = context.len(),
            prompt_len = prompt.len(),
            "generating answer"
        );

        let request = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: &prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };
        let url = self.client.url(&self.model, "generateContent");
        let response: GenerateContentResponse =
            self.client.post(&url, &request, generation_fault).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect::<String>())
            .ok_or_else(|| generation_fault("response contained no candidates".into()))?;

        Ok(text.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_are_prefixed_once() {
        assert_eq!(model_path("gemini-2.0-flash"), "models/gemini-2.0-flash");
        assert_eq!(model_path("models/embedding-001"), "models/embedding-001");
    }

    #[test]
    fn embedding_provider_takes_model_and_dimensions_from_config() {
        let config = RagConfig::builder()
            .embedding_model_id("gemini-embedding-001")
            .embedding_dimensions(3072)
            .build()
            .unwrap();
        let provider = GeminiEmbeddingProvider::from_config(GeminiClient::new("key").unwrap(), &config);
        assert_eq!(provider.model_id(), "models/gemini-embedding-001");
        assert_eq!(provider.dimensions(), 3072);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(GeminiClient::new("  "), Err(RagError::InvalidParameter(_))));
    }

    #[test]
    fn batch_request_uses_camel_case_fields() {
        let request = BatchEmbedContentsRequest {
            requests: vec![EmbedContentRequest {
                model: "models/embedding-001",
                content: Content { role: None, parts: vec![Part { text: "hi" }] },
                task_type: "RETRIEVAL_DOCUMENT",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "hi");
        assert!(json["requests"][0]["content"].get("role").is_none());
    }

    #[test]
    fn generation_config_serializes_max_output_tokens() {
        let config = GenerationConfig { temperature: 0.3, max_output_tokens: 500 };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["maxOutputTokens"], 500);
    }
}
