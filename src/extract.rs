//! Document loading.
//!
//! Knows how to turn a file into one narration-ready `String`: PDFs go
//! through `pdf-extract` page by page, plain text is read verbatim. Pages are
//! joined with a separator and NFKC-normalized, which folds the ligatures
//! (`ﬁ`, `ﬂ`) PDF text layers are full of. Any failure is terminal; partial
//! text is never returned.

use crate::error::ExtractionError;
use std::fs;
use std::panic;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

/// Text pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// File name shown in history and logs.
    pub name: String,
    pub pages: usize,
    pub text: String,
}

/// Load a document from disk, dispatching on its extension.
pub fn load_document(path: &Path, page_separator: &str) -> Result<ExtractedDocument, ExtractionError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let read = || {
        fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    let pages = match extension.as_str() {
        "pdf" => {
            info!(path = %path.display(), "Extracting PDF text");
            extract_pages(&read()?)?
        }
        "txt" | "text" => {
            info!(path = %path.display(), "Loading plain text content");
            let bytes = read()?;
            vec![String::from_utf8_lossy(&bytes).into_owned()]
        }
        _ => return Err(ExtractionError::UnsupportedFormat { extension }),
    };

    let page_count = pages.len();
    let text = join_pages(pages, page_separator);
    if text.trim().is_empty() {
        warn!(path = %path.display(), "Document contains no extractable text");
    }
    info!(
        pages = page_count,
        total_chars = text.chars().count(),
        "Finished loading document"
    );
    Ok(ExtractedDocument {
        name,
        pages: page_count,
        text,
    })
}

/// Ordered page texts of a PDF held in memory.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of erroring.
    let outcome = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match outcome {
        Ok(Ok(pages)) => {
            debug!(pages = pages.len(), "Parsed PDF pages");
            Ok(pages)
        }
        Ok(Err(err)) => Err(ExtractionError::Pdf {
            message: err.to_string(),
        }),
        Err(_) => Err(ExtractionError::Pdf {
            message: "parser aborted on malformed document".to_string(),
        }),
    }
}

/// Normalize each page, trim its edges and join with `separator`. Pages with
/// no text are skipped so blank scans do not stack separators.
pub fn join_pages<I>(pages: I, separator: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .map(|page| page.nfkc().collect::<String>().trim().to_string())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
