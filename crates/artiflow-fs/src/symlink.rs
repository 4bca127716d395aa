use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub fn is_symlink(path: impl AsRef<Path>) -> bool {
    std::fs::symlink_metadata(path.as_ref()).is_ok_and(|m| m.file_type().is_symlink())
}

pub fn read_link(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    std::fs::read_link(path).map_err(|e| Error::read(path, e))
}

/// Removes `path` when it is a symlink, leaving regular files alone.
/// Returns whether a link was removed.
pub fn remove_if_symlink(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if !is_symlink(path) {
        return Ok(false);
    }
    std::fs::remove_file(path).map_err(|e| Error::write(path, e))?;
    Ok(true)
}

/// Creates `link -> target`, replacing whatever currently sits at `link`.
pub fn replace_symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
    let target = target.as_ref();
    let link = link.as_ref();

    if std::fs::symlink_metadata(link).is_ok() {
        std::fs::remove_file(link).map_err(|e| Error::write(link, e))?;
    }
    if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| Error::write(link, e))
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link).map_err(|e| Error::write(link, e))
        } else {
            std::os::windows::fs::symlink_file(target, link).map_err(|e| Error::write(link, e))
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(Error::SymlinkNotSupported)
    }
}
