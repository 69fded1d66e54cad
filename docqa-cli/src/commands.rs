//! Subcommand execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use docqa_rag::gemini::{GeminiAnswerGenerator, GeminiClient, GeminiEmbeddingProvider};
use docqa_rag::{QueryResponse, RagConfig, RagError, RagPipeline, VectorIndex};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, Commands};

/// Characters of each source chunk shown in text output.
const PREVIEW_CHARS: usize = 80;

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.rag_config().context("invalid configuration")?;

    match cli.command {
        Commands::Ingest { paths, .. } => ingest(config, &paths).await,
        Commands::Ask { question, json, .. } => ask(config, &question, json).await,
        Commands::Status { json } => status(&config, json).await,
    }
}

fn build_pipeline(config: RagConfig) -> anyhow::Result<RagPipeline> {
    let client = GeminiClient::from_env()?;
    let embedder = GeminiEmbeddingProvider::from_config(client.clone(), &config);
    let generator = GeminiAnswerGenerator::from_config(client, &config);

    Ok(RagPipeline::builder()
        .embedding_provider(Arc::new(embedder))
        .answer_generator(Arc::new(generator))
        .config(config)
        .build()?)
}

async fn ingest(config: RagConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let report = pipeline.ingest_paths(paths).await?;

    info!(index_dir = %pipeline.index_dir().display(), "ingest finished");
    println!(
        "Indexed {} chunks from {} documents ({} dimensions) into {}",
        report.entry_count,
        report.document_count,
        report.dimensions,
        pipeline.index_dir().display()
    );
    Ok(())
}

async fn ask(config: RagConfig, question: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let response = pipeline.query(question, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&AskOutput::from(&response))?);
    } else {
        print!("{}", render_answer(&response));
    }
    Ok(())
}

async fn status(config: &RagConfig, json: bool) -> anyhow::Result<()> {
    let report = StatusReport::probe(&config.index_dir).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let (Some(entries), Some(dimensions)) = (report.entries, report.dimensions) {
        println!("Index at {}: {entries} entries, {dimensions} dimensions", report.index_dir);
    } else {
        println!("No index at {}", report.index_dir);
    }
    Ok(())
}

/// JSON shape printed by `ask --json`.
#[derive(Debug, Serialize)]
pub struct AskOutput<'a> {
    pub answer: &'a str,
    pub answered: bool,
    pub sources: Vec<SourceOutput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SourceOutput<'a> {
    pub id: &'a str,
    pub score: f32,
    pub text: &'a str,
}

impl<'a> From<&'a QueryResponse> for AskOutput<'a> {
    fn from(response: &'a QueryResponse) -> Self {
        Self {
            answer: &response.answer.text,
            answered: !response.answer.is_no_answer(),
            sources: response
                .sources
                .iter()
                .map(|s| SourceOutput { id: &s.chunk.id, score: s.score, text: &s.chunk.text })
                .collect(),
        }
    }
}

/// Human-readable rendering of a query response.
pub fn render_answer(response: &QueryResponse) -> String {
    let mut out = format!("{}\n", response.answer.text.trim_end());
    if response.sources.is_empty() {
        return out;
    }

    out.push_str("\nSources:\n");
    for source in &response.sources {
        let preview: String = source
            .chunk
            .text
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        let ellipsis = if source.chunk.text.chars().count() > PREVIEW_CHARS { "..." } else { "" };
        out.push_str(&format!("  [{:.3}] {}: {preview}{ellipsis}\n", source.score, source.chunk.id));
    }
    out
}

/// Snapshot presence and size, as printed by `status`.
#[derive(Debug, Serialize, PartialEq)]
pub struct StatusReport {
    pub index_dir: String,
    pub indexed: bool,
    pub entries: Option<usize>,
    pub dimensions: Option<usize>,
}

impl StatusReport {
    /// Inspect the snapshot in `dir` without contacting any service.
    ///
    /// # Errors
    ///
    /// Fails only if a snapshot exists but is unreadable.
    pub async fn probe(dir: &Path) -> docqa_rag::Result<Self> {
        let index_dir = dir.display().to_string();
        match VectorIndex::load(dir).await {
            Ok(index) => Ok(Self {
                index_dir,
                indexed: true,
                entries: Some(index.len()),
                dimensions: Some(index.dimensions().unwrap_or_default()),
            }),
            Err(RagError::IndexNotFound { .. }) => {
                Ok(Self { index_dir, indexed: false, entries: None, dimensions: None })
            }
            Err(e) => Err(e),
        }
    }
}

/// Process exit code for a failed command.
///
/// | code | cause |
/// |------|-------|
/// | 1 | other failure |
/// | 2 | invalid parameter or configuration |
/// | 3 | no index, run `ingest` first |
/// | 4 | corrupt index or dimension mismatch |
/// | 5 | embedding or generation service failure |
/// | 6 | a document could not be loaded |
/// | 7 | snapshot storage failure |
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(rag) = err.chain().find_map(|cause| cause.downcast_ref::<RagError>()) else {
        return 1;
    };
    match rag {
        RagError::InvalidParameter(_) => 2,
        RagError::IndexNotFound { .. } => 3,
        RagError::IndexCorrupt { .. } | RagError::DimensionMismatch { .. } => 4,
        RagError::EmbeddingService { .. } | RagError::GenerationService { .. } => 5,
        RagError::DocumentLoad { .. } => 6,
        RagError::Storage { .. } => 7,
    }
}
