use std::io::{self, Read, Seek};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar(Compression),
}

impl ArchiveFormat {
    /// Format implied by the artifact name, the way repositories store them.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") || lower.ends_with(".jar") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::Tar(Compression::Gzip))
        } else if lower.ends_with(".tar") {
            Some(Self::Tar(Compression::None))
        } else {
            None
        }
    }

    pub fn is_supported_name(name: &str) -> bool { Self::from_file_name(name).is_some() }
}

pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Tar(Compression::Gzip)),
        _ if is_tar_header(data) => Some(ArchiveFormat::Tar(Compression::None)),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool { data.len() >= 263 && data[257..262] == *b"ustar" }

/// Sniffs the leading bytes and rewinds.
pub fn detect_from_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(512);
    reader.by_ref().take(512).read_to_end(&mut header)?;
    reader.rewind()?;
    Ok(detect_format(&header))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_zip_format() {
        let zip_header = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];
        assert_eq!(detect_format(&zip_header), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_tar_gz_format() {
        let gz_header = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(detect_format(&gz_header), Some(ArchiveFormat::Tar(Compression::Gzip)));
    }

    #[test]
    fn detect_tar_plain_format() {
        let mut tar_header = [0u8; 512];
        tar_header[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(detect_format(&tar_header), Some(ArchiveFormat::Tar(Compression::None)));
    }

    #[test]
    fn detect_unknown_and_truncated() {
        assert_eq!(detect_format(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
        assert_eq!(detect_format(&[0u8; 256]), None);
    }

    #[test]
    fn detect_rewinds_reader() {
        let mut cursor = io::Cursor::new(vec![0x1F, 0x8B, 0x08, 0x00, 0x01]);
        assert_eq!(
            detect_from_reader(&mut cursor).unwrap(),
            Some(ArchiveFormat::Tar(Compression::Gzip))
        );
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn format_from_name() {
        assert_eq!(ArchiveFormat::from_file_name("a/b/pkg.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(
            ArchiveFormat::from_file_name("pkg.tgz"),
            Some(ArchiveFormat::Tar(Compression::Gzip))
        );
        assert_eq!(
            ArchiveFormat::from_file_name("pkg.tar"),
            Some(ArchiveFormat::Tar(Compression::None))
        );
        assert!(!ArchiveFormat::is_supported_name("pkg.rpm"));
    }
}
