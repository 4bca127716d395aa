use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use crate::error::{Error, Result};
use crate::format::{ArchiveFormat, Compression};
use crate::sanitize::{sanitize_entry_path, sanitize_symlink_target};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Extracts a seekable archive into `dest`.
pub fn extract<R: Read + Seek>(format: ArchiveFormat, reader: R, dest: &Path) -> Result<ExtractReport> {
    match format {
        ArchiveFormat::Zip => extract_zip(reader, dest),
        ArchiveFormat::Tar(compression) => extract_tar(reader, compression, dest),
    }
}

pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<ExtractReport> {
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| Error::Malformed(e.to_string()))?;
    let mut report = ExtractReport::default();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let entry_path = file.enclosed_name().ok_or(Error::UnnamedEntry)?.to_path_buf();
        let out = sanitize_entry_path(&entry_path, dest)?;
        let mode = file.unix_mode();

        if file.is_dir() {
            artiflow_fs::create_dir_all(&out)?;
        } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            file.read_to_string(&mut target)
                .map_err(|source| Error::WriteEntry {
                    entry: entry_path.clone(),
                    source,
                })?;
            let target = sanitize_symlink_target(Path::new(&target), &out, dest)?;
            artiflow_fs::replace_symlink(target, &out)?;
        } else {
            report.total_bytes += write_entry(&mut file, &out, &entry_path)?;
            set_mode(&out, mode);
        }
        report.entry_count += 1;
    }

    tracing::debug!(entries = report.entry_count, dest = %dest.display(), "extracted zip archive");
    Ok(report)
}

pub fn extract_tar<R: Read>(reader: R, compression: Compression, dest: &Path) -> Result<ExtractReport> {
    match compression {
        Compression::None => unpack_tar(tar::Archive::new(reader), dest),
        Compression::Gzip => unpack_tar(tar::Archive::new(flate2::read::GzDecoder::new(reader)), dest),
    }
}

fn unpack_tar<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<ExtractReport> {
    let mut report = ExtractReport::default();

    for entry in archive.entries().map_err(|e| Error::Malformed(e.to_string()))? {
        let mut entry = entry.map_err(|e| Error::Malformed(e.to_string()))?;
        let entry_path = entry.path().map_err(|_| Error::UnnamedEntry)?.into_owned();
        let out = sanitize_entry_path(&entry_path, dest)?;
        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().ok();

        if entry_type.is_dir() {
            artiflow_fs::create_dir_all(&out)?;
        } else if entry_type.is_symlink() {
            let target = entry
                .link_name()
                .map_err(|_| Error::UnnamedEntry)?
                .ok_or(Error::UnnamedEntry)?
                .into_owned();
            let target = sanitize_symlink_target(&target, &out, dest)?;
            artiflow_fs::replace_symlink(target, &out)?;
        } else if entry_type.is_file() {
            report.total_bytes += write_entry(&mut entry, &out, &entry_path)?;
            set_mode(&out, mode);
        } else {
            tracing::debug!(entry = %entry_path.display(), "skipping unsupported tar entry type");
            continue;
        }
        report.entry_count += 1;
    }

    tracing::debug!(entries = report.entry_count, dest = %dest.display(), "extracted tar archive");
    Ok(report)
}

fn write_entry(reader: &mut impl Read, out: &Path, entry_path: &Path) -> Result<u64> {
    if let Some(parent) = out.parent() {
        artiflow_fs::create_dir_all(parent)?;
    }
    let mut file = File::create(out).map_err(|source| Error::WriteEntry {
        entry: entry_path.to_path_buf(),
        source,
    })?;
    io::copy(reader, &mut file).map_err(|source| Error::WriteEntry {
        entry: entry_path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode.map(|m| m & 0o7777).filter(|m| *m != 0) {
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
            tracing::warn!(path = %path.display(), error = %e, "failed to apply entry permissions");
        }
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) {}
