//! Error taxonomy for the narrator library.
//!
//! Library seams return these typed errors; the binary wraps them in
//! `anyhow` with context.

use std::path::PathBuf;

/// Failure to turn a document into text. Terminal: no text is loaded.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("PDF extraction failed: {message}")]
    Pdf { message: String },
}

/// Errors surfaced by the playback controller.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The engine rejected or failed a segment. Recoverable: playback halts at
    /// that segment until the caller stops, seeks or plays again.
    #[error("speech engine failed on segment {segment}: {message}")]
    Engine { segment: usize, message: String },

    /// Invalid knob; rejected before any state change.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Failures talking to a remote speech API.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("no API key found (set {variable})")]
    MissingApiKey { variable: &'static str },

    #[error("nothing to synthesize")]
    EmptyText,

    #[error("request to {provider} failed")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
}
