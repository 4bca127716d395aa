use crate::error::{Error, Result};

/// One byte range of a ranged download. `end` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: u32,
    pub start: u64,
    pub end:   u64,
}

impl ChunkPlan {
    pub fn len(&self) -> u64 { self.end - self.start }

    pub fn is_empty(&self) -> bool { self.end == self.start }

    /// `Range` header value; HTTP ranges are inclusive.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// Splits `file_size` into `split_count` contiguous ranges of
/// `file_size / split_count` bytes, the last one absorbing the remainder.
pub fn plan_chunks(file_size: u64, split_count: u32) -> Result<Vec<ChunkPlan>> {
    if split_count == 0 {
        return Err(Error::InvalidState("split count must be greater than 0".into()));
    }
    let count = u64::from(split_count).min(file_size.max(1));
    let chunk_size = file_size / count;
    let remainder = file_size % count;

    Ok((0..count)
        .map(|i| {
            let start = i * chunk_size;
            let mut end = start + chunk_size;
            if i == count - 1 {
                end += remainder;
            }
            ChunkPlan {
                index: i as u32,
                start,
                end,
            }
        })
        .collect())
}
