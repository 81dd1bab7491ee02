//! Error type shared by every source assembler.
//!
//! Build-fatal kinds propagate out of [`crate::ingest::build_document`];
//! the recoverable kinds (`SnippetResolution`, `IdentifierResolution`) are
//! constructed where they happen, logged, and turned into an omission or
//! an `<error>` element instead.

use thiserror::Error;

/// Result alias for library operations.
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The input locator matches none of the known source shapes.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// A remote endpoint answered with a non-2xx status.
    #[error("request to {url} failed with HTTP {status}")]
    RemoteFetch { url: String, status: u16 },

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A response body was not the JSON shape we expected.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A `.ipynb` file could not be parsed as a notebook.
    #[error("notebook {name} could not be converted: {source}")]
    Notebook {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A code reference inside an issue comment could not be resolved.
    #[error("code snippet {url} could not be resolved: {reason}")]
    SnippetResolution { url: String, reason: String },

    /// A DOI/PMID lookup did not lead to a PDF.
    #[error("no PDF found for identifier {identifier}: {reason}")]
    IdentifierResolution { identifier: String, reason: String },

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True for failures that a bounded retry may fix (rate limits, server
    /// errors, dropped connections).
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::RemoteFetch { status, .. } => *status == 429 || *status >= 500,
            IngestError::Transport { .. } => true,
            _ => false,
        }
    }
}
