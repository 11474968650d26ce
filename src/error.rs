//! Error types for every fallible boundary of the caption pipeline.

use thiserror::Error;

/// Structural problems with an untrusted caption document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    #[error("Invalid caption format received from API: {path} {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("Caption JSON could not be parsed: {0}")]
    Syntax(String),
}

impl CaptionError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while asking a caption data source for a script.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Empty response from caption generator")]
    EmptyResponse,

    #[error("Missing API key (set GEMINI_API_KEY or api_key in config)")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Caption(#[from] CaptionError),
}

/// Session-level problems surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please describe the video content first.")]
    EmptyDescription,

    #[error("Please upload a video first.")]
    NoVideo,

    #[error("Captions are already being generated.")]
    AlreadyGenerating,

    #[error("{0}")]
    Generation(String),
}

/// Problems while accepting or probing a video file.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Not a video file: {0}")]
    UnsupportedType(String),

    #[error("ffprobe not found in PATH")]
    ProbeUnavailable,

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
