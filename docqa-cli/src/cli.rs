//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use docqa_rag::{RagConfig, RagConfigBuilder};

/// Ask questions about a collection of documents.
#[derive(Debug, Parser)]
#[command(name = "docqa", about = "Retrieval-augmented question answering over documents", version)]
pub struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long, global = true, env = "DOCQA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the index snapshot
    #[arg(long, global = true, env = "DOCQA_INDEX_DIR")]
    pub index_dir: Option<PathBuf>,

    /// Embedding model identifier
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Length of the vectors the embedding model produces
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Answer generation model identifier
    #[arg(long, global = true, env = "DOCQA_ANSWER_MODEL")]
    pub answer_model: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "DOCQA_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the index from documents, replacing any previous one
    Ingest {
        /// PDF or text files to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum chunk length in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared by consecutive chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        question: String,

        /// Number of chunks to retrieve as context
        #[arg(long, short = 'k')]
        top_k: Option<usize>,

        /// Print the answer and sources as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show whether an index exists and how large it is
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Resolve the effective configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the merged values are invalid.
    pub fn rag_config(&self) -> docqa_rag::Result<RagConfig> {
        let base = match &self.config {
            Some(path) => RagConfig::from_json_file(path)?,
            None => RagConfig::default(),
        };

        let mut builder = RagConfigBuilder::from_config(base);
        if let Some(dir) = &self.index_dir {
            builder = builder.index_dir(dir.clone());
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model_id(model.clone());
        }
        if let Some(dimensions) = self.embedding_dimensions {
            builder = builder.embedding_dimensions(dimensions);
        }
        if let Some(model) = &self.answer_model {
            builder = builder.answer_model_id(model.clone());
        }
        match &self.command {
            Commands::Ingest { chunk_size, chunk_overlap, .. } => {
                if let Some(size) = chunk_size {
                    builder = builder.chunk_size(*size);
                }
                if let Some(overlap) = chunk_overlap {
                    builder = builder.chunk_overlap(*overlap);
                }
            }
            Commands::Ask { top_k: Some(k), .. } => builder = builder.top_k(*k),
            _ => {}
        }
        builder.build()
    }
}
