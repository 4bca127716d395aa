use artiflow_fetch::{DEFAULT_MIN_SPLIT_SIZE, DEFAULT_SPLIT_COUNT, FetchOptions};

pub const DEFAULT_THREADS: usize = 3;
/// Uploads at least this large try a checksum deploy first.
pub const DEFAULT_MIN_CHECKSUM_DEPLOY: u64 = 10 * 1024;
/// Sync tries a checksum deploy for anything this large.
pub const SYNC_MIN_CHECKSUM_DEPLOY: u64 = 1024;
pub const DEFAULT_SYNC_THREADS: usize = 16;

/// Settings every batch operation shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOptions {
    pub threads:   usize,
    pub dry_run:   bool,
    pub fail_fast: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            threads:   DEFAULT_THREADS,
            dry_run:   false,
            fail_fast: false,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

#[derive(Clone, Debug)]
pub struct UploadOptions {
    pub transfer:            TransferOptions,
    pub min_checksum_deploy: u64,
    /// Upload symlinks as empty artifacts carrying their target.
    pub symlinks:            bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            transfer:            TransferOptions::default(),
            min_checksum_deploy: DEFAULT_MIN_CHECKSUM_DEPLOY,
            symlinks:            false,
        }
    }
}

impl UploadOptions {
    #[must_use]
    pub fn transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }

    #[must_use]
    pub fn min_checksum_deploy(mut self, bytes: u64) -> Self {
        self.min_checksum_deploy = bytes;
        self
    }

    #[must_use]
    pub fn symlinks(mut self, symlinks: bool) -> Self {
        self.symlinks = symlinks;
        self
    }
}

#[derive(Clone, Debug)]
pub struct DownloadOptions {
    pub transfer:          TransferOptions,
    pub split_count:       u32,
    pub min_split_size:    Option<u64>,
    /// Recreate symlinks recorded on upload.
    pub symlinks:          bool,
    /// Check the sha1 of a recreated symlink's target.
    pub validate_symlinks: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            transfer:          TransferOptions::default(),
            split_count:       DEFAULT_SPLIT_COUNT,
            min_split_size:    Some(DEFAULT_MIN_SPLIT_SIZE),
            symlinks:          false,
            validate_symlinks: false,
        }
    }
}

impl DownloadOptions {
    #[must_use]
    pub fn transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }

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
    pub fn symlinks(mut self, symlinks: bool) -> Self {
        self.symlinks = symlinks;
        self
    }

    #[must_use]
    pub fn validate_symlinks(mut self, validate: bool) -> Self {
        self.validate_symlinks = validate;
        self
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .split_count(self.split_count)
            .min_split_size(self.min_split_size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOptions {
    pub threads:             usize,
    pub min_checksum_deploy: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            threads:             DEFAULT_SYNC_THREADS,
            min_checksum_deploy: SYNC_MIN_CHECKSUM_DEPLOY,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn min_checksum_deploy(mut self, bytes: u64) -> Self {
        self.min_checksum_deploy = bytes;
        self
    }
}
