//! Brute-force vector index with cosine similarity and on-disk snapshots.
//!
//! [`VectorIndex`] is a plain owned value: entries live in insertion order in
//! a `Vec`, and search scores every entry. Sharing between concurrent readers
//! is the pipeline's job (it publishes snapshots behind an `Arc`).
//!
//! A snapshot is one JSON file, `index.json`, inside the index directory:
//!
//! ```text
//! { "format": "docqa-index", "version": 1, "dimensions": 768, "entries": [...] }
//! ```
//!
//! It is written to a temporary file and renamed into place, so readers see
//! either the previous snapshot or the new one, never a partial write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::document::{IndexEntry, SearchResult};
use crate::error::{RagError, Result};

/// Format tag written in every snapshot header.
pub const SNAPSHOT_FORMAT: &str = "docqa-index";

/// Snapshot layout version understood by this implementation.
pub const SNAPSHOT_VERSION: u32 = 1;

/// File name of the snapshot inside the index directory.
pub const SNAPSHOT_FILE: &str = "index.json";

/// Distinguishes temporary files of concurrent saves within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A temporary file name no other save, in this or another process, is using.
fn tmp_file_name() -> String {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{SNAPSHOT_FILE}.{}.{seq}.tmp", std::process::id())
}

/// An append-only set of [`IndexEntry`]s supporting cosine similarity search.
///
/// The dimensionality is fixed by the first entry ever added; later entries
/// and query vectors must match it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: &'a str,
    version: u32,
    dimensions: Option<usize>,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct Snapshot {
    format: String,
    version: u32,
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Returns 0.0 if either vector has zero magnitude. The result is clamped to
/// `[-1, 1]` to absorb rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

impl VectorIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality fixed by the first write, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append entries. Duplicates are kept.
    ///
    /// Either all entries are added or none are.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if an embedding is empty or holds a
    ///   NaN or infinite component.
    /// - [`RagError::DimensionMismatch`] if an embedding's length differs from
    ///   the index dimensionality (or from the first entry of this batch when
    ///   the index is still empty).
    pub fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut expected = self.dimensions;
        for entry in &entries {
            let actual = entry.embedding.len();
            if actual == 0 {
                return Err(RagError::InvalidParameter(format!(
                    "chunk '{}' has an empty embedding",
                    entry.chunk.id
                )));
            }
            if !entry.embedding.iter().all(|x| x.is_finite()) {
                return Err(RagError::InvalidParameter(format!(
                    "chunk '{}' has a non-finite embedding component",
                    entry.chunk.id
                )));
            }
            match expected {
                Some(expected) if expected != actual => {
                    return Err(RagError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
                None => expected = Some(actual),
            }
        }

        self.dimensions = expected;
        self.entries.extend(entries);
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Entries with equal scores keep their insertion order. At most
    /// `min(k, len)` results are returned; an empty index yields none.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if `k == 0`.
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidParameter("k must be greater than zero".into()));
        }
        let Some(expected) = self.dimensions else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: query.len() });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query)))
            .collect();

        // `sort_by` is stable, which keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Persist the full entry set to `dir`, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if the directory or file cannot be written.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let storage_err = |path: &Path, e: std::io::Error| RagError::Storage {
            location: path.display().to_string(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(dir).await.map_err(|e| storage_err(dir, e))?;

        let snapshot = SnapshotRef {
            format: SNAPSHOT_FORMAT,
            version: SNAPSHOT_VERSION,
            dimensions: self.dimensions,
            entries: &self.entries,
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| RagError::Storage {
            location: dir.display().to_string(),
            message: format!("failed to serialize snapshot: {e}"),
        })?;

        let tmp_path = dir.join(tmp_file_name());
        let final_path = snapshot_path(dir);

        let written = async {
            let mut file =
                tokio::fs::File::create(&tmp_path).await.map_err(|e| storage_err(&tmp_path, e))?;
            file.write_all(&bytes).await.map_err(|e| storage_err(&tmp_path, e))?;
            file.sync_all().await.map_err(|e| storage_err(&tmp_path, e))?;
            drop(file);

            tokio::fs::rename(&tmp_path, &final_path)
                .await
                .map_err(|e| storage_err(&final_path, e))
        }
        .await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp_path).await;
        }
        written?;

        info!(
            location = %final_path.display(),
            entries = self.entries.len(),
            bytes = bytes.len(),
            "index snapshot saved"
        );
        Ok(())
    }

    /// Restore an index previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if `dir` holds no snapshot.
    /// - [`RagError::IndexCorrupt`] if the snapshot cannot be parsed, carries
    ///   another format tag or version, or is internally inconsistent.
    /// - [`RagError::Storage`] for other I/O failures.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = snapshot_path(dir);
        let location = dir.display().to_string();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound { location });
            }
            Err(e) => {
                return Err(RagError::Storage {
                    location: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let corrupt = |message: String| RagError::IndexCorrupt { location: location.clone(), message };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(format!("unreadable snapshot: {e}")))?;

        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(corrupt(format!("unexpected format tag '{}'", snapshot.format)));
        }
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        match snapshot.dimensions {
            None if !snapshot.entries.is_empty() => {
                return Err(corrupt("entries present but no dimensions recorded".into()));
            }
            Some(dimensions) => {
                if let Some(bad) =
                    snapshot.entries.iter().find(|e| e.embedding.len() != dimensions)
                {
                    return Err(corrupt(format!(
                        "entry '{}' has {} dimensions, header says {dimensions}",
                        bad.chunk.id,
                        bad.embedding.len()
                    )));
                }
            }
            None => {}
        }

        debug!(location = %path.display(), entries = snapshot.entries.len(), "index snapshot loaded");
        Ok(Self { dimensions: snapshot.dimensions, entries: snapshot.entries })
    }

    /// Whether `dir` contains a snapshot file (its validity is not checked).
    pub async fn exists(dir: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(snapshot_path(dir.as_ref())).await.unwrap_or(false)
    }
}

/// Location of the snapshot file inside `dir`.
pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}
