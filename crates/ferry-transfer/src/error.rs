//! Error types for ferry-transfer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transfer request: {0}")]
    Validation(String),

    #[error("source type '{mime_type}' has no binary representation and cannot be fetched by range")]
    UnsupportedSourceKind { mime_type: String },

    #[error("source does not support ranged downloads: {0}")]
    RangeUnsupported(String),

    #[error("destination is not configured for resumable upload: {0}")]
    Configuration(String),

    #[error("failed to open upload session ({status}): {body}")]
    Session { status: u16, body: String },

    #[error("ranged download failed ({status}): {body}")]
    Download { status: u16, body: String },

    #[error("source returned {actual} bytes for a {expected}-byte range")]
    RangeMismatch { expected: u64, actual: u64 },

    #[error("upload of chunk {index} failed ({status}): {body}")]
    Transfer { index: usize, status: u16, body: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("checkpoint store error: {0}")]
    Store(String),

    #[error("corrupt checkpoint: {0}")]
    Checkpoint(#[source] serde_json::Error),
}

impl Error {
    /// Whether the failure came from the destination rejecting a chunk.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Error::Transfer { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
