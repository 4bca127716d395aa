use crate::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Presents an ordered list of files as one seekable byte stream.
///
/// Zip extraction needs random access to the central directory at the end of
/// the archive, so chunk files are read through this instead of being merged
/// to disk first.
#[derive(Debug)]
pub struct MultiFileReader {
    files:   Vec<File>,
    starts:  Vec<u64>,
    lengths: Vec<u64>,
    size:    u64,
    pos:     u64,
}

impl MultiFileReader {
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        let mut starts = Vec::with_capacity(paths.len());
        let mut lengths = Vec::with_capacity(paths.len());
        let mut size = 0u64;

        for path in paths {
            let path = path.as_ref();
            let file = File::open(path).map_err(|e| Error::read(path, e))?;
            let len = file.metadata().map_err(|e| Error::read(path, e))?.len();
            starts.push(size);
            lengths.push(len);
            size += len;
            files.push(file);
        }

        Ok(Self {
            files,
            starts,
            lengths,
            size,
            pos: 0,
        })
    }

    pub fn size(&self) -> u64 { self.size }

    fn locate(&self, pos: u64) -> usize {
        // Last file whose start is at or before `pos`; empty files are skipped
        // because a following file shares their start offset.
        self.starts.partition_point(|&start| start <= pos).saturating_sub(1)
    }
}

impl Read for MultiFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.size {
            return Ok(0);
        }
        let index = self.locate(self.pos);
        let local = self.pos - self.starts[index];
        let remaining = self.lengths[index] - local;
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let file = &mut self.files[index];
        file.seek(SeekFrom::Start(local))?;
        let read = file.read(&mut buf[..want])?;
        self.pos += read as u64;
        Ok(read)
    }
}

impl Seek for MultiFileReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative or overflowing position")
        })?;
        self.pos = target;
        Ok(target)
    }
}
