//! Local filesystem primitives used by artifact transfers: the per-command
//! scratch context, symlink helpers, local listing and a reader that stitches
//! chunk files together.

mod context;
mod error;
mod multi_reader;
mod symlink;
mod walk;

pub use context::{ScratchDir, TransferContext};
pub use error::{Error, Result};
pub use multi_reader::MultiFileReader;
pub use symlink::{is_symlink, read_link, remove_if_symlink, replace_symlink};
pub use walk::{EntryKind, LocalEntry, WalkOptions, list_entries};

use std::path::{Path, PathBuf};

/// Joins `dir` and `name`, creating `dir` when missing.
pub fn create_file_path(dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir).map_err(|e| Error::write(dir, e))?;
    }
    Ok(dir.join(name))
}

pub fn create_dir_all(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| Error::write(dir, e))
}

pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::write(path, e)),
    }
}
