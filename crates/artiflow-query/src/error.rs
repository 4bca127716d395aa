use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("pattern must not be empty")]
    EmptyPattern,

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid property '{0}': expected key=value")]
    InvalidProperty(String),

    #[error("file spec must contain exactly one of pattern or aql")]
    AmbiguousSpec,

    #[error("build '{0}' was not found")]
    BuildNotFound(String),

    #[error(transparent)]
    Fetch(#[from] artiflow_fetch::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason:  reason.to_string(),
        }
    }
}
