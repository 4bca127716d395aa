use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves an archive entry path under `base`, rejecting absolute entries and
/// entries whose `..` segments climb out of `base`.
pub fn sanitize_entry_path(entry_path: &Path, base: &Path) -> Result<PathBuf> {
    let normalized = normalize_path(entry_path);
    if normalized.is_absolute() || normalized.has_root() {
        return Err(Error::EntryEscapes {
            entry:    entry_path.to_path_buf(),
            resolved: normalized,
        });
    }
    if escapes(entry_path) {
        return Err(Error::EntryEscapes {
            entry:    entry_path.to_path_buf(),
            resolved: base.join(&normalized),
        });
    }
    Ok(base.join(normalized))
}

/// Checks that a link target, taken relative to the link's directory, stays
/// inside `base`. Returns the target unchanged so relative links survive.
pub fn sanitize_symlink_target(target: &Path, link: &Path, base: &Path) -> Result<PathBuf> {
    let resolved = if target.is_absolute() {
        normalize_path(target)
    } else {
        let parent = link.parent().unwrap_or(base);
        normalize_path(&parent.join(target))
    };
    if !resolved.starts_with(normalize_path(base)) {
        return Err(Error::LinkEscapes {
            target: target.to_path_buf(),
            resolved,
        });
    }
    Ok(target.to_path_buf())
}

fn escapes(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        if cfg!(windows) { Path::new("C:/opt/out") } else { Path::new("/opt/out") }
    }

    #[test]
    fn relative_entry_resolves_under_base() {
        let resolved = sanitize_entry_path(Path::new("bin/./tool"), base()).unwrap();
        assert_eq!(resolved, base().join("bin").join("tool"));
    }

    #[test]
    fn inner_parent_dirs_allowed() {
        let resolved = sanitize_entry_path(Path::new("a/../b/c"), base()).unwrap();
        assert_eq!(resolved, base().join("b").join("c"));
    }

    #[test]
    fn escaping_entries_rejected() {
        let result = sanitize_entry_path(Path::new("../../etc/passwd"), base());
        assert!(matches!(result, Err(Error::EntryEscapes { .. })));

        let absolute = if cfg!(windows) { "C:\\etc\\passwd" } else { "/etc/passwd" };
        let result = sanitize_entry_path(Path::new(absolute), base());
        assert!(matches!(result, Err(Error::EntryEscapes { .. })));
    }

    #[test]
    fn symlink_targets() {
        let link = base().join("bin/mylink");
        assert!(sanitize_symlink_target(Path::new("../lib/x"), &link, base()).is_ok());
        let result = sanitize_symlink_target(Path::new("../../../etc"), &link, base());
        assert!(matches!(result, Err(Error::LinkEscapes { .. })));
    }
}
