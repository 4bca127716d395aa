//! Repository items to local files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use artiflow_fetch::{DownloadMode, DownloadRequest, Endpoint, Fetcher, HttpClient};
use artiflow_fs::TransferContext;
use artiflow_query::{FileSpec, ResultItem, SearchExecutor, SpecKind, local_path_and_file, substitute_groups};
use artiflow_verify::Checksums;

use crate::deploy::file_checksums;
use crate::error::{Error, Result};
use crate::options::DownloadOptions;
use crate::pool::{Handler, Runner, Worker, log_prefix};
use crate::summary::{TransferSummary, TransferredFile};

/// One item and the local layout it lands in.
#[derive(Clone, Debug)]
pub struct DownloadTask {
    pub item:    ResultItem,
    /// Spec target with `{i}` placeholders already substituted.
    pub target:  String,
    pub flat:    bool,
    pub explode: bool,
}

impl DownloadTask {
    /// Local directory and file name of the item.
    pub fn local_path(&self) -> PathBuf {
        let (dir, file) = local_path_and_file(&self.item.name, &self.item.path, &self.target, self.flat);
        if dir.is_empty() { PathBuf::from(file) } else { Path::new(&dir).join(file) }
    }
}

/// Turns search results into download tasks: every file, plus the folders
/// no other result creates. Folders are taken longest path first and skipped
/// when nested in the previous one; unless `flat`, a folder that already
/// holds a file is skipped too.
pub fn plan_downloads(spec: &FileSpec, items: Vec<ResultItem>) -> Result<Vec<DownloadTask>> {
    let regex = match spec.kind() {
        SpecKind::Aql => None,
        _ => Some(spec.pattern_regex()?),
    };
    let task = |item: ResultItem| {
        let target = match &regex {
            Some(regex) => substitute_groups(regex, &item.relative_path(), &spec.target),
            None => spec.target.clone(),
        };
        DownloadTask {
            item,
            target,
            flat: spec.flat,
            explode: spec.explode,
        }
    };

    let mut tasks = Vec::new();
    let mut created_dirs = HashSet::new();
    let mut folders = Vec::new();
    for item in items {
        if item.is_folder() {
            folders.push(item);
        } else {
            created_dirs.insert(item.path.clone());
            tasks.push(task(item));
        }
    }

    let key = |item: &ResultItem| {
        if item.path == "." { item.name.clone() } else { format!("{}/{}", item.path, item.name) }
    };
    folders.sort_by_key(|item| std::cmp::Reverse(key(item)));
    let mut previous: Option<String> = None;
    for folder in folders {
        let path = key(&folder);
        let nested = previous
            .as_deref()
            .is_some_and(|prev| prev.strip_prefix(path.as_str()).is_some_and(|rest| rest.starts_with('/')));
        if path == "." || nested {
            previous = Some(path);
            continue;
        }
        if spec.flat || !created_dirs.contains(&path) {
            tasks.push(task(folder));
        }
        previous = Some(path);
    }
    Ok(tasks)
}

/// Downloads the items file specs match.
pub struct Downloader<'a, C> {
    endpoint: &'a Endpoint<C>,
    ctx:      &'a TransferContext,
    options:  DownloadOptions,
}

impl<'a, C: HttpClient> Downloader<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>, ctx: &'a TransferContext, options: DownloadOptions) -> Self {
        Self { endpoint, ctx, options }
    }

    pub async fn download(&self, specs: &[FileSpec]) -> Result<TransferSummary> {
        for spec in specs {
            spec.validate()?;
        }
        let transfer = self.options.transfer;
        let runner = Runner::new(transfer.threads).fail_fast(transfer.fail_fast);
        let search = SearchExecutor::new(self.endpoint);
        let report = runner
            .run(self, async {
                for spec in specs {
                    tracing::info!("Searching items to download...");
                    let items = search.search(spec).await?;
                    for task in plan_downloads(spec, items)? {
                        runner.queue().push(task)?;
                    }
                }
                Ok::<(), Error>(())
            })
            .await;

        let summary = TransferSummary::from(report);
        tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "downloaded {} artifacts", summary.succeeded);
        Ok(summary)
    }

    async fn download_item(&self, task: DownloadTask, prefix: &str) -> Result<Option<TransferredFile>> {
        let relative = task.item.relative_path();
        tracing::info!("{prefix}Downloading {relative}");
        if self.options.transfer.dry_run {
            return Ok(None);
        }

        let local = task.local_path();
        if task.item.is_folder() {
            artiflow_fs::create_dir_all(&local)?;
            return Ok(None);
        }
        artiflow_fs::remove_if_symlink(&local)?;

        if self.options.symlinks {
            if let Some(link_target) = task.item.symlink_target() {
                self.create_symlink(&task.item, link_target, &local)?;
                tracing::debug!("{prefix}Creating symlink file {}", local.display());
                return Ok(None);
            }
        }

        if local.is_file() {
            let existing = file_checksums(&local).await?;
            if existing.md5 == task.item.actual_md5 && existing.sha1 == task.item.actual_sha1 {
                tracing::debug!("{prefix}File already exists locally: {}", local.display());
                return Ok(None);
            }
        }

        let url = self.endpoint.url(&relative)?;
        let request = DownloadRequest::new(url, &local)
            .size(task.item.size)
            .sha1(Some(task.item.actual_sha1.clone()))
            .explode(task.explode);
        let fetcher = Fetcher::new(self.endpoint.client(), self.ctx).with_options(self.options.fetch_options());
        match fetcher.fetch(&request).await? {
            DownloadMode::Bulk => tracing::debug!("{prefix}Downloaded {relative}"),
            DownloadMode::Ranged { chunks } => tracing::debug!("{prefix}Downloaded {relative} in {chunks} parts"),
        }

        Ok(Some(TransferredFile {
            local_path:  local,
            remote_path: relative,
            checksums:   Checksums {
                md5:    task.item.actual_md5,
                sha1:   task.item.actual_sha1,
                sha256: task.item.sha256,
            },
        }))
    }

    fn create_symlink(&self, item: &ResultItem, link_target: &str, local: &Path) -> Result<()> {
        if self.options.validate_symlinks {
            validate_symlink_target(item, Path::new(link_target))?;
        }
        artiflow_fs::replace_symlink(link_target, local)?;
        Ok(())
    }
}

/// Checks that `link_target` exists and holds the content recorded at upload.
fn validate_symlink_target(item: &ResultItem, link_target: &Path) -> Result<()> {
    let expected = item.symlink_sha1().unwrap_or_default();
    if !link_target.is_file() {
        return Err(Error::MissingPath(link_target.to_path_buf()));
    }
    let actual = Checksums::from_file(link_target)
        .map_err(|e| Error::checksum(link_target, e))?
        .sha1;
    if expected != actual {
        return Err(Error::SymlinkMismatch {
            path:     link_target.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

impl<C: HttpClient> Handler for Downloader<'_, C> {
    type Task = DownloadTask;
    type Slot = Vec<TransferredFile>;

    async fn handle(&self, task: DownloadTask, worker: &mut Worker<'_, DownloadTask, Vec<TransferredFile>>) -> Result<()> {
        let prefix = log_prefix(worker.id(), self.options.transfer.dry_run);
        if let Some(file) = self.download_item(task, &prefix).await? {
            worker.slot().push(file);
        }
        Ok(())
    }

    /// Items the server refuses to serve are logged and counted, not recorded
    /// as the run error.
    fn is_fatal(&self, error: &Error) -> bool { !error.is_status() }
}
