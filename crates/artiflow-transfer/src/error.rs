//! Error types for artiflow-transfer.

use std::path::PathBuf;

use artiflow_verify::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] artiflow_query::Error),

    #[error(transparent)]
    Fetch(#[from] artiflow_fetch::Error),

    #[error(transparent)]
    Fs(#[from] artiflow_fs::Error),

    #[error("failed to checksum {}: {source}", path.display())]
    Checksum {
        path:   PathBuf,
        source: VerificationError,
    },

    #[error("local path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("symlink {} points at content with sha1 {actual}, expected {expected}", path.display())]
    SymlinkMismatch {
        path:     PathBuf,
        expected: String,
        actual:   String,
    },

    #[error("invalid transfer timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("repository '{0}' is missing from the storage summary")]
    UnknownRepository(String),

    #[error("failed {operation} {count} artifacts")]
    Failed { operation: &'static str, count: usize },

    #[error("task queue is closed")]
    Stopped,

    #[error("background task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn checksum(path: impl Into<PathBuf>, source: VerificationError) -> Self {
        Self::Checksum {
            path: path.into(),
            source,
        }
    }

    /// The server answered with an unexpected status.
    pub fn is_status(&self) -> bool { self.status().is_some() }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch(e) | Self::Query(artiflow_query::Error::Fetch(e)) => e.status(),
            _ => None,
        }
    }
}
