use std::fmt;

pub const DEFAULT_SPLIT_COUNT: u32 = 3;
pub const DEFAULT_MIN_SPLIT_SIZE: u64 = 5120 * 1000;

/// Download tuning.
#[derive(Clone)]
pub struct FetchOptions {
    /// Parallel ranges per file; 0 disables ranged downloads.
    pub split_count:    u32,
    /// Smallest size worth splitting; `None` never splits.
    pub min_split_size: Option<u64>,
    pub headers:        Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            split_count:    DEFAULT_SPLIT_COUNT,
            min_split_size: Some(DEFAULT_MIN_SPLIT_SIZE),
            headers:        Vec::new(),
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values may carry credentials.
        f.debug_struct("FetchOptions")
            .field("split_count", &self.split_count)
            .field("min_split_size", &self.min_split_size)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl FetchOptions {
    #[must_use]
    pub fn split_count(mut self, split_count: u32) -> Self {
        self.split_count = split_count;
        self
    }

    #[must_use]
    pub fn min_split_size(mut self, min_split_size: Option<u64>) -> Self {
        self.min_split_size = min_split_size;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Whether a file of `size` bytes is a candidate for ranged download,
    /// before asking the server whether it supports ranges.
    pub fn wants_split(&self, size: u64) -> bool {
        self.split_count > 0 && self.min_split_size.is_some_and(|min| size >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_split() {
        let options = FetchOptions::default();
        assert!(!options.wants_split(DEFAULT_MIN_SPLIT_SIZE - 1));
        assert!(options.wants_split(DEFAULT_MIN_SPLIT_SIZE));
        assert!(!options.clone().split_count(0).wants_split(u64::MAX));
        assert!(!options.min_split_size(None).wants_split(u64::MAX));
    }
}
