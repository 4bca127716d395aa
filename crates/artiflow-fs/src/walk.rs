use crate::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WalkOptions {
    recursive:         bool,
    include_dirs:      bool,
    preserve_symlinks: bool,
}

impl WalkOptions {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn include_dirs(mut self, include_dirs: bool) -> Self {
        self.include_dirs = include_dirs;
        self
    }

    /// Report symlinks as links instead of following them.
    #[must_use]
    pub fn preserve_symlinks(mut self, preserve: bool) -> Self {
        self.preserve_symlinks = preserve;
        self
    }
}

/// Lists the entries below `root` in file-name order. A `root` that is itself
/// a file (or a preserved symlink) yields just that entry.
pub fn list_entries(root: impl AsRef<Path>, options: WalkOptions) -> Result<Vec<LocalEntry>> {
    let root = root.as_ref();
    let meta = std::fs::symlink_metadata(root).map_err(|e| Error::read(root, e))?;
    if meta.file_type().is_symlink() && options.preserve_symlinks {
        return Ok(vec![LocalEntry {
            path: root.to_path_buf(),
            kind: EntryKind::Symlink,
        }]);
    }
    if !root.is_dir() {
        return Ok(vec![LocalEntry {
            path: root.to_path_buf(),
            kind: EntryKind::File,
        }]);
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(if options.recursive { usize::MAX } else { 1 })
        .follow_links(!options.preserve_symlinks)
        .sort_by_file_name();

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| Error::Walk {
            path:    root.to_path_buf(),
            message: e.to_string(),
        })?;
        let file_type = entry.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        if kind == EntryKind::Dir && !options.include_dirs {
            continue;
        }
        entries.push(LocalEntry {
            path: entry.into_path(),
            kind,
        });
    }
    Ok(entries)
}
