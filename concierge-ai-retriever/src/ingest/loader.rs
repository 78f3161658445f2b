//! Directory loading with per-file outcomes.

use crate::ingest::parsers;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed source document, ready for chunking. Immutable once created;
/// discarded after chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// Full text content.
    pub content: String,
    /// String metadata; always carries `source` (the file path).
    pub metadata: HashMap<String, String>,
}

impl Document {
    fn from_file(path: &Path, content: String) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), path.display().to_string());
        Self { content, metadata }
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// Why a single file could not be ingested.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },
}

/// A file that failed to ingest, kept observable instead of swallowed.
#[derive(Debug)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Outcome of loading one corpus directory. The batch always completes:
/// failures and skips are recorded, never propagated.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Successfully parsed documents, in sorted path order.
    pub documents: Vec<Document>,
    /// Files that matched a supported extension but failed to parse.
    pub failures: Vec<IngestFailure>,
    /// Files with unsupported extensions.
    pub skipped: Vec<PathBuf>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Load every supported file in `dir`.
///
/// Files are visited in sorted order so chunk and index-entry ordering is
/// reproducible. A missing or unreadable directory yields an empty report.
/// This function never fails as a whole.
pub fn load_directory(dir: &Path) -> IngestReport {
    let mut report = IngestReport::default();

    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(error) => {
            tracing::warn!("corpus directory {} is not readable: {error}", dir.display());
            return report;
        }
    };
    paths.sort();

    for path in paths {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let outcome = match extension.as_deref() {
            Some("pdf") => parsers::parse_pdf(&path).map_err(|error| IngestError::Pdf {
                path: path.clone(),
                message: format!("{error:#}"),
            }),
            Some("html") | Some("htm") => read_file(&path).map(|raw| parsers::parse_html(&raw)),
            Some("txt") | Some("md") | Some("markdown") => read_file(&path),
            _ => {
                tracing::debug!("skipping unsupported file {}", path.display());
                report.skipped.push(path);
                continue;
            }
        };

        match outcome {
            Ok(content) => report.documents.push(Document::from_file(&path, content)),
            Err(error) => {
                tracing::warn!("skipping {}: {error}", path.display());
                report.failures.push(IngestFailure { path, error });
            }
        }
    }

    tracing::info!(
        documents = report.documents.len(),
        failures = report.failures.len(),
        skipped = report.skipped.len(),
        "loaded corpus from {}",
        dir.display()
    );
    report
}

fn read_file(path: &Path) -> Result<String, IngestError> {
    fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
