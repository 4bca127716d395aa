//! Batch operations against artifact repositories.
//!
//! Every operation turns file specs or search results into tasks and runs
//! them on a [`Runner`]: a fixed number of workers fed by one producer, with
//! per-worker tallies and the first fatal error kept in an [`ErrorsQueue`].
//!
//! - [`Uploader`] walks local files and deploys them, by checksum when the
//!   server already holds the content.
//! - [`Downloader`] fetches search results, in byte ranges when the server
//!   allows it, and recreates empty folders and symlinks.
//! - [`PropsService`], [`MoveCopyService`] and [`DeleteService`] act on
//!   search results server-side.
//! - [`RepoSyncEngine`] copies a repository between two servers, skipping
//!   files unchanged since their last copy.

mod delete;
mod deploy;
mod download;
mod error;
mod errors_queue;
mod movecopy;
pub mod options;
mod pool;
mod props;
mod summary;
mod sync;
mod upload;

pub use delete::DeleteService;
pub use download::{DownloadTask, Downloader, plan_downloads};
pub use error::{Error, Result};
pub use errors_queue::ErrorsQueue;
pub use movecopy::{MoveCopyService, MoveType, move_destination};
pub use options::{DownloadOptions, SyncOptions, TransferOptions, UploadOptions};
pub use pool::{Handler, RunReport, Runner, Tally, TaskQueue, Worker, log_prefix};
pub use props::PropsService;
pub use summary::{TransferSummary, TransferredFile};
pub use sync::{RepoSyncEngine, RepositorySummary, SyncCounts, SyncReport, SyncTask, TRANSFER_TIMESTAMP, transfer_required};
pub use upload::{UploadKind, UploadTask, Uploader, plan_uploads, upload_target};
