use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONTEXT_PREFIX: &str = "artiflow.";

/// Process-scoped scratch directory shared by every transfer of one command.
///
/// The directory is removed exactly once: either through [`TransferContext::close`],
/// which reports removal failures, or on drop when an error path skipped it.
#[derive(Debug)]
pub struct TransferContext {
    dir: TempDir,
}

impl TransferContext {
    pub fn new() -> Result<Self> { Self::new_in(std::env::temp_dir()) }

    pub fn new_in(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        std::fs::create_dir_all(base).map_err(|source| Error::Scratch {
            path: base.to_path_buf(),
            source,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(CONTEXT_PREFIX)
            .tempdir_in(base)
            .map_err(|source| Error::Scratch {
                path: base.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %dir.path().display(), "created transfer scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path { self.dir.path() }

    /// Unique sub-directory for one ranged download. Chunk files inside it
    /// never collide with another download of a file with the same name.
    pub fn scratch_dir(&self, label: &str) -> Result<ScratchDir> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{label}."))
            .tempdir_in(self.path())
            .map_err(|source| Error::Scratch {
                path: self.path().to_path_buf(),
                source,
            })?;
        Ok(ScratchDir { dir })
    }

    /// Staging location for an item copied between repositories,
    /// `<context>/<repo>/<path>/<name>`. Parent directories are created.
    pub fn staging_file(&self, repo: &str, path: &str, name: &str) -> Result<PathBuf> {
        let mut parent = self.path().join(repo);
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            parent.push(segment);
        }
        std::fs::create_dir_all(&parent).map_err(|e| Error::write(&parent, e))?;
        Ok(parent.join(name))
    }

    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| Error::Cleanup { path, source })
    }
}

#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path { self.dir.path() }

    pub fn chunk_path(&self, file_name: &str, index: u32) -> PathBuf {
        self.dir.path().join(format!("{file_name}_{index}"))
    }
}
