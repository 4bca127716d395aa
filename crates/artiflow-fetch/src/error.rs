//! Error types for artiflow-fetch.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server responded {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path:     PathBuf,
        expected: String,
        actual:   String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("file I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] artiflow_fs::Error),

    #[error(transparent)]
    Archive(#[from] artiflow_archive::Error),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("background task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Non-success HTTP status, as opposed to transport or local failures.
    pub fn is_status(&self) -> bool { matches!(self, Self::Status { .. }) }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport failures and server-side (5xx) statuses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
