//! Content verification primitives for transferred artifacts.
//!
//! Hashing is incremental so digests are computed while bytes move, and the
//! md5/sha1/sha256 triple the repository server reports can be produced in a
//! single pass.
//!
//! ```
//! use artiflow_verify::{Sha1Hasher, VerifiedReader};
//! use std::io::Read;
//!
//! let data = b"hello world";
//! let expected = Sha1Hasher::digest_hex(data);
//!
//! let mut reader = VerifiedReader::new(&data[..], Sha1Hasher::new());
//! let mut buffer = Vec::new();
//! reader.read_to_end(&mut buffer).unwrap();
//! reader.finish(&expected).unwrap();
//! ```

pub use self::checksums::{ChecksumHasher, Checksums};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{DigestHasher, Hasher, Md5Hasher, Sha1Hasher, Sha256Hasher};
pub use self::reader::VerifiedReader;

mod checksums;
mod error;
mod hasher;
mod reader;
