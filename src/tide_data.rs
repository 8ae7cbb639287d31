//! # Tide Table Acquisition
//!
//! This module obtains the raw bytes of a tide table and defines the error
//! taxonomy shared by every ingestion path.
//!
//! ## Source Resolution
//! 1. **Local file**: used whenever the configured path exists
//! 2. **Remote document**: fetched only if the local path is absent and a URL is
//!    configured, with caller-supplied headers and an explicit timeout
//! 3. **Nothing usable**: [`TideError::SourceMissing`], which aborts the run
//!
//! There is no retry. A failed fetch fails the run, since an empty summary would
//! read as "no big tides" rather than "no data".
//!
//! ## Row-Level Failures
//! Malformed rows never abort a run. Parsers record them as [`SkippedRow`]
//! diagnostics in a [`ParseReport`] returned next to the parsed data, so callers
//! can tell "empty source" apart from "every row failed".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can abort a run.
///
/// Row-level problems are deliberately absent: those are [`SkippedRow`]
/// diagnostics.
#[derive(Error, Debug)]
pub enum TideError {
    /// Neither a readable local file nor a fetchable remote document
    #[error("tide source missing: {0}")]
    SourceMissing(String),

    /// A document was read but no dated observations came out of it
    #[error("no tide data parsed from {0} (image-only or unrecognised layout?)")]
    NoDataParsed(String),

    /// CSV header lacks one of the required columns
    #[error("CSV must have headers {required:?}; got {found:?}")]
    MissingColumns {
        required: Vec<&'static str>,
        found: Vec<String>,
    },

    /// HTTP request failed (network, timeout, or non-success status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Report window that cannot be represented as calendar dates
    #[error("invalid report window: {0}")]
    InvalidWindow(String),

    /// Remote API answered but reported a failure
    #[error("API error: {0}")]
    Api(String),

    /// Local file operations failed
    #[error("IO: {0}")]
    Io(#[from] io::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a tide table comes from.
#[derive(Clone, Debug, Default)]
pub struct SourceSpec {
    /// Local file, preferred when it exists
    pub path: Option<PathBuf>,
    /// Remote document, used only when the local file is absent
    pub url: Option<String>,
}

/// Options for the remote fetch.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
        }
    }
}

/// Raw document bytes plus a label naming where they came from.
#[derive(Clone, Debug)]
pub struct SourceBytes {
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Resolve a source to bytes: local file first, then the remote URL.
///
/// # Errors
/// [`TideError::SourceMissing`] when nothing is configured, or when the local
/// file is absent and the remote fetch fails.
pub async fn acquire(spec: &SourceSpec, opts: &FetchOptions) -> Result<SourceBytes, TideError> {
    if let Some(path) = &spec.path {
        if path.exists() {
            let bytes = fs::read(path)?;
            info!(path = %path.display(), bytes = bytes.len(), "read local tide table");
            return Ok(SourceBytes {
                label: path.display().to_string(),
                bytes,
            });
        }
        debug!(path = %path.display(), "local tide table absent");
    }

    let Some(url) = &spec.url else {
        return Err(TideError::SourceMissing(match &spec.path {
            Some(path) => format!("{} does not exist and no remote URL is configured", path.display()),
            None => "no local path or remote URL configured".to_string(),
        }));
    };

    match fetch_bytes(url, opts).await {
        Ok(bytes) => {
            info!(%url, bytes = bytes.len(), "fetched remote tide table");
            Ok(SourceBytes {
                label: url.clone(),
                bytes,
            })
        }
        Err(error) => {
            warn!(%url, %error, "remote tide table fetch failed");
            Err(TideError::SourceMissing(format!("fetch of {url} failed: {error}")))
        }
    }
}

/// GET a URL with the configured headers and timeout, returning the body.
pub async fn fetch_bytes(url: &str, opts: &FetchOptions) -> Result<Vec<u8>, TideError> {
    let client = reqwest::Client::builder()
        .timeout(opts.timeout)
        .default_headers(header_map(&opts.headers))
        .build()?;

    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Build a header map, dropping entries that are not valid HTTP headers.
fn header_map(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "ignoring invalid fetch header"),
        }
    }
    map
}

/// Does the path look like a PDF (by extension or magic bytes)?
pub fn is_pdf(label: &str, bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
        || Path::new(label)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// One record that was skipped during parsing, and why.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRow {
    /// Human-readable position, e.g. `"row 14"` or `"page 3 line 22"`
    pub location: String,
    pub reason: String,
}

/// Best-effort extraction summary returned alongside parsed data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseReport {
    /// Observations added to the event store (after de-duplication)
    pub accepted: usize,
    /// Observations that were exact duplicates of one already stored
    pub duplicates: usize,
    pub skipped: Vec<SkippedRow>,
}

impl ParseReport {
    pub fn skip(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        let row = SkippedRow {
            location: location.into(),
            reason: reason.into(),
        };
        debug!(location = %row.location, reason = %row.reason, "skipped row");
        self.skipped.push(row);
    }

    /// Log a one-line summary; warns only when something was skipped.
    pub fn log_summary(&self, source: &str) {
        if self.skipped.is_empty() {
            info!(source, accepted = self.accepted, duplicates = self.duplicates, "parsed tide table");
        } else {
            warn!(
                source,
                accepted = self.accepted,
                duplicates = self.duplicates,
                skipped = self.skipped.len(),
                "parsed tide table with skipped rows"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_local_file_wins() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), b"date,time,height_m\n").unwrap();

        let spec = SourceSpec {
            path: Some(file.path().to_path_buf()),
            url: Some("http://127.0.0.1:9/never-fetched.pdf".to_string()),
        };
        let source = acquire(&spec, &FetchOptions::default()).await.unwrap();
        assert_eq!(source.bytes, b"date,time,height_m\n");
    }

    #[tokio::test]
    async fn test_missing_everything_is_source_missing() {
        let spec = SourceSpec {
            path: Some(PathBuf::from("/nonexistent/tides.csv")),
            url: None,
        };
        let err = acquire(&spec, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, TideError::SourceMissing(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_source_missing() {
        let spec = SourceSpec {
            path: None,
            // Port 9 (discard) on loopback refuses connections
            url: Some("http://127.0.0.1:9/tides.pdf".to_string()),
        };
        let opts = FetchOptions {
            timeout: Duration::from_secs(2),
            ..FetchOptions::default()
        };
        let err = acquire(&spec, &opts).await.unwrap_err();
        assert!(matches!(err, TideError::SourceMissing(_)));
    }

    #[test]
    fn test_pdf_detection() {
        assert!(is_pdf("tides.PDF", b""));
        assert!(is_pdf("download", b"%PDF-1.7"));
        assert!(!is_pdf("tides.csv", b"date,time"));
    }

    #[test]
    fn test_report_records_skips() {
        let mut report = ParseReport::default();
        report.skip("row 3", "non-numeric height");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "non-numeric height");
    }
}
