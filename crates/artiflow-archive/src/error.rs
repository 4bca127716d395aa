use std::io;
use std::path::PathBuf;

/// Why an exploded artifact could not be unpacked.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("entry '{}' would be written outside the destination, at '{}'", entry.display(), resolved.display())]
    EntryEscapes { entry: PathBuf, resolved: PathBuf },

    #[error("link target '{}' leaves the destination ('{}')", target.display(), resolved.display())]
    LinkEscapes { target: PathBuf, resolved: PathBuf },

    #[error("archive entry has no usable name")]
    UnnamedEntry,

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("cannot write entry '{}': {source}", entry.display())]
    WriteEntry { entry: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] artiflow_fs::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
