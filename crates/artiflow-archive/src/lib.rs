//! Archive extraction for artifacts deployed or downloaded with "explode".
//!
//! Zip needs random access, so callers hand in a `Read + Seek` source (a file
//! or a reader spanning download chunks). Tar streams are read sequentially.
//! Every entry path is checked against the destination before anything is
//! written.

pub use error::{Error, Result};
pub use extract::{ExtractReport, extract, extract_tar, extract_zip};
pub use format::{ArchiveFormat, Compression, detect_format, detect_from_reader};
pub use sanitize::{sanitize_entry_path, sanitize_symlink_target};

mod error;
mod extract;
mod format;
mod sanitize;
