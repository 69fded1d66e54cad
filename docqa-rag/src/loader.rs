//! Document loading from files and uploaded bytes.
//!
//! PDFs (detected by their `%PDF-` magic) are split into one page per PDF
//! page using `lopdf`; this needs the `pdf` feature. Anything else must be
//! UTF-8 text, split into pages on form feed characters.

use std::path::Path;

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";
const FORM_FEED: char = '\x0c';

/// Load a document from a file. The file name becomes the document id.
pub async fn load_path(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| RagError::DocumentLoad {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })?;

    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(load_bytes(id, &bytes)?.with_source_uri(path.display().to_string()))
}

/// Load every path in order, failing on the first unreadable one.
pub async fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_path(path).await?);
    }
    Ok(documents)
}

/// Load a document from an uploaded byte stream.
pub fn load_bytes(id: impl Into<String>, bytes: &[u8]) -> Result<Document> {
    let id = id.into();
    if bytes.starts_with(PDF_MAGIC) {
        return load_pdf(id, bytes);
    }

    let text = std::str::from_utf8(bytes).map_err(|e| RagError::DocumentLoad {
        source_name: id.clone(),
        message: format!("not a PDF and not valid UTF-8 text: {e}"),
    })?;
    let pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
    debug!(document.id = %id, page_count = pages.len(), "loaded text document");
    Ok(Document::from_pages(id, pages))
}

#[cfg(feature = "pdf")]
fn load_pdf(id: String, bytes: &[u8]) -> Result<Document> {
    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| RagError::DocumentLoad {
        source_name: id.clone(),
        message: format!("failed to parse PDF: {e}"),
    })?;

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for page in page_numbers {
        match pdf.extract_text(&[page]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(document.id = %id, page, error = %e, "failed to extract page text, skipping");
            }
        }
    }

    if pages.iter().all(|p| p.trim().is_empty()) {
        warn!(document.id = %id, "no text extracted from PDF");
    }
    debug!(document.id = %id, page_count = pages.len(), "loaded PDF document");
    Ok(Document::from_pages(id, pages))
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(id: String, _bytes: &[u8]) -> Result<Document> {
    Err(RagError::DocumentLoad {
        source_name: id,
        message: "PDF support requires the `pdf` feature".into(),
    })
}
