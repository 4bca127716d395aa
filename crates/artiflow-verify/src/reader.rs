use std::io::{self, Read};

use crate::{Hasher, Result, VerificationError};

/// Reader that hashes data as it passes through, so content can be checked
/// against an expected digest without a second read.
pub struct VerifiedReader<R, H> {
    reader: R,
    hasher: H,
}

impl<R, H> VerifiedReader<R, H> {
    pub fn new(reader: R, hasher: H) -> Self { Self { reader, hasher } }
}

impl<R: Read, H: Hasher> Read for VerifiedReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }
}

impl<R: Read, H: Hasher> VerifiedReader<R, H> {
    /// Consumes whatever the caller left unread, then compares the digest
    /// with `expected_hex` (case-insensitive).
    pub fn finish(mut self, expected_hex: &str) -> Result<()> {
        io::copy(&mut self.reader, &mut HashSink(&mut self.hasher))?;
        let actual = self.hasher.finalize_hex();
        if actual.eq_ignore_ascii_case(expected_hex) {
            Ok(())
        } else {
            Err(VerificationError::Mismatch {
                expected: expected_hex.to_string(),
                actual,
            })
        }
    }
}

struct HashSink<'a, H>(&'a mut H);

impl<H: Hasher> io::Write for HashSink<'_, H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sha1Hasher;
    use std::io::Cursor;

    #[test]
    fn test_verified_reader_success_with_partial_read() {
        let data = b"test data for verification";
        let expected = Sha1Hasher::digest_hex(data);

        let mut verified = VerifiedReader::new(Cursor::new(data), Sha1Hasher::new());
        let mut buffer = [0; 4];
        verified.read_exact(&mut buffer).unwrap();

        verified.finish(&expected.to_uppercase()).unwrap();
    }

    #[test]
    fn test_verified_reader_mismatch() {
        let verified = VerifiedReader::new(Cursor::new(b"test data"), Sha1Hasher::new());
        match verified.finish("0000") {
            Err(VerificationError::Mismatch { expected, actual }) => {
                assert_eq!(expected, "0000");
                assert_eq!(actual, Sha1Hasher::digest_hex(b"test data"));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }
}
