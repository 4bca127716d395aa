use crate::{Hasher, Md5Hasher, Result, Sha1Hasher, Sha256Hasher};
use std::io::Read;
use std::path::Path;

/// Hex-encoded md5, sha1 and sha256 of one piece of content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Checksums {
    pub md5:    String,
    pub sha1:   String,
    pub sha256: String,
}

impl Checksums {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = ChecksumHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut hasher = ChecksumHasher::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }
}

/// Single pass over the content feeding all three digests.
#[derive(Clone, Debug, Default)]
pub struct ChecksumHasher {
    md5:    Md5Hasher,
    sha1:   Sha1Hasher,
    sha256: Sha256Hasher,
}

impl ChecksumHasher {
    pub fn new() -> Self { Self::default() }

    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    pub fn finish(self) -> Checksums {
        Checksums {
            md5:    self.md5.finalize_hex(),
            sha1:   self.sha1.finalize_hex(),
            sha256: self.sha256.finalize_hex(),
        }
    }
}
