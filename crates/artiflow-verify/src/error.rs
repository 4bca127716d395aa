use std::io;

/// Failure while hashing or comparing transferred content.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("content digest {actual} does not match the expected {expected}")]
    Mismatch { expected: String, actual: String },

    #[error("could not read content to hash: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
