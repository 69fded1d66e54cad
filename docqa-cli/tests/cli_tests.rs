//! Tests for argument parsing, configuration merging and command output.

use clap::Parser;
use docqa_cli::commands::{AskOutput, StatusReport, render_answer};
use docqa_cli::{Cli, Commands, LogFormat, exit_code};
use docqa_rag::{Answer, Chunk, IndexEntry, NO_ANSWER_SENTINEL, QueryResponse, RagError, SearchResult, VectorIndex};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("docqa").chain(args.iter().copied())).unwrap()
}

fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        document_id: "doc".to_string(),
        index: 0,
        start: 0,
        end: text.chars().count(),
        text: text.to_string(),
    }
}

#[test]
fn ingest_requires_at_least_one_path() {
    assert!(Cli::try_parse_from(["docqa", "ingest"]).is_err());

    let cli = parse(&["ingest", "a.pdf", "b.txt", "--chunk-size", "200", "--chunk-overlap", "20"]);
    match cli.command {
        Commands::Ingest { paths, chunk_size, chunk_overlap } => {
            assert_eq!(paths.len(), 2);
            assert_eq!(chunk_size, Some(200));
            assert_eq!(chunk_overlap, Some(20));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_are_accepted_after_the_subcommand() {
    let cli = parse(&["ask", "what is it?", "--index-dir", "/tmp/idx", "--log-format", "json", "-k", "3"]);
    assert_eq!(cli.log_format, LogFormat::Json);
    assert_eq!(cli.index_dir.as_deref(), Some(std::path::Path::new("/tmp/idx")));
    assert!(matches!(cli.command, Commands::Ask { top_k: Some(3), json: false, .. }));
}

#[test]
fn flags_override_defaults() {
    let config = parse(&["--index-dir", "custom", "ingest", "x.txt", "--chunk-size", "300", "--chunk-overlap", "30"])
        .rag_config()
        .unwrap();
    assert_eq!(config.chunk_size, 300);
    assert_eq!(config.chunk_overlap, 30);
    assert_eq!(config.top_k, 5);
    assert_eq!(config.index_dir, std::path::PathBuf::from("custom"));

    let config = parse(&["--embedding-dimensions", "3072", "status"]).rag_config().unwrap();
    assert_eq!(config.embedding_dimensions, 3072);
    assert_eq!(parse(&["status"]).rag_config().unwrap().embedding_dimensions, 768);

    let config = parse(&["ask", "q", "--top-k", "2"]).rag_config().unwrap();
    assert_eq!(config.top_k, 2);
    assert_eq!(config.chunk_size, 1000);
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docqa.json");
    std::fs::write(&path, r#"{"chunk_size": 400, "chunk_overlap": 40, "top_k": 8}"#).unwrap();
    let path = path.to_str().unwrap();

    let config = parse(&["--config", path, "status"]).rag_config().unwrap();
    assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (400, 40, 8));

    let config = parse(&["--config", path, "ask", "q", "--top-k", "1"]).rag_config().unwrap();
    assert_eq!(config.top_k, 1);
    assert_eq!(config.chunk_size, 400);
}

#[test]
fn invalid_overrides_are_rejected() {
    let err = parse(&["ingest", "x.txt", "--chunk-size", "10", "--chunk-overlap", "10"])
        .rag_config()
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidParameter(_)));

    let err = parse(&["ask", "q", "--top-k", "0"]).rag_config().unwrap_err();
    assert!(matches!(err, RagError::InvalidParameter(_)));
}

#[test]
fn exit_codes_follow_error_kind() {
    let code = |e: RagError| exit_code(&anyhow::Error::new(e));

    assert_eq!(code(RagError::InvalidParameter("k".into())), 2);
    assert_eq!(code(RagError::IndexNotFound { location: "x".into() }), 3);
    assert_eq!(code(RagError::IndexCorrupt { location: "x".into(), message: "bad".into() }), 4);
    assert_eq!(code(RagError::DimensionMismatch { expected: 3, actual: 2 }), 4);
    assert_eq!(code(RagError::EmbeddingService { provider: "p".into(), message: "m".into() }), 5);
    assert_eq!(code(RagError::GenerationService { provider: "p".into(), message: "m".into() }), 5);
    assert_eq!(code(RagError::DocumentLoad { source_name: "f".into(), message: "m".into() }), 6);
    assert_eq!(code(RagError::Storage { location: "x".into(), message: "m".into() }), 7);
    assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
}

#[test]
fn exit_code_sees_through_context() {
    let err = anyhow::Error::new(RagError::InvalidParameter("top_k".into())).context("invalid configuration");
    assert_eq!(exit_code(&err), 2);
}

#[tokio::test]
async fn status_reports_missing_and_present_index() {
    let dir = tempfile::tempdir().unwrap();

    let report = StatusReport::probe(dir.path()).await.unwrap();
    assert!(!report.indexed);
    assert_eq!(report.entries, None);

    let mut index = VectorIndex::new();
    index
        .add(vec![
            IndexEntry { embedding: vec![1.0, 0.0], chunk: chunk("doc_0", "alpha") },
            IndexEntry { embedding: vec![0.0, 1.0], chunk: chunk("doc_1", "beta") },
        ])
        .unwrap();
    index.save(dir.path()).await.unwrap();

    let report = StatusReport::probe(dir.path()).await.unwrap();
    assert!(report.indexed);
    assert_eq!(report.entries, Some(2));
    assert_eq!(report.dimensions, Some(2));
}

#[test]
fn answer_rendering_lists_sources() {
    let long = "x".repeat(200);
    let response = QueryResponse {
        answer: Answer { text: "The sky is blue.\n".into() },
        sources: vec![
            SearchResult { chunk: chunk("a_0", "the sky\nis blue"), score: 0.9123 },
            SearchResult { chunk: chunk("a_1", &long), score: 0.5 },
        ],
    };

    let out = render_answer(&response);
    assert!(out.starts_with("The sky is blue.\n\nSources:\n"));
    assert!(out.contains("  [0.912] a_0: the sky is blue\n"));
    assert!(out.contains(&format!("  [0.500] a_1: {}...\n", "x".repeat(80))));
}

#[test]
fn json_output_flags_unanswered_questions() {
    let response = QueryResponse {
        answer: Answer { text: format!("{NO_ANSWER_SENTINEL}.") },
        sources: vec![SearchResult { chunk: chunk("a_0", "grass is green"), score: 0.1 }],
    };

    let value = serde_json::to_value(AskOutput::from(&response)).unwrap();
    assert_eq!(value["answered"], false);
    assert_eq!(value["sources"][0]["id"], "a_0");
    assert_eq!(value["sources"][0]["text"], "grass is green");
}
