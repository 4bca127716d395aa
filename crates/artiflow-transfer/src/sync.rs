//! Incremental copy of one repository between two servers.
//!
//! The walk starts with a folder task for the repository root. Each folder
//! task lists its immediate children and queues a folder task per subfolder
//! and a file task per file, so the tree is covered one level per task.
//!
//! A file is copied when it carries no [`TRANSFER_TIMESTAMP`] property or was
//! modified after the recorded one. The property is written to the source
//! item before the copy starts: a copy interrupted halfway is not retried by
//! the next run unless the file changes again.

use std::time::{Duration, Instant};

use artiflow_fetch::{Body, DownloadRequest, Endpoint, FetchOptions, Fetcher, HttpClient, Method};
use artiflow_fs::TransferContext;
use artiflow_query::{Properties, Property, ResultItem, SearchExecutor, directory_query};
use artiflow_verify::Checksums;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::deploy::{checksum_deploy, deploy_url, put, set_properties};
use crate::error::{Error, Result};
use crate::options::SyncOptions;
use crate::pool::{Handler, Runner, Worker, log_prefix};

/// Source property recording when an item was last sent, in unix seconds.
pub const TRANSFER_TIMESTAMP: &str = "jf.cli.transfer.timestamp";

const STORAGE_INFO_API: &str = "api/storageinfo";

#[derive(Clone, Debug)]
pub enum SyncTask {
    Folder { repo: String, path: String },
    File(ResultItem),
}

/// Folders and files one worker finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub folders: usize,
    pub files:   usize,
}

#[derive(Debug)]
pub struct SyncReport {
    /// Folders walked, the repository root excluded.
    pub folders: usize,
    /// Files handled, whether copied or already up to date.
    pub files:   usize,
    pub failed:  usize,
    pub error:   Option<Error>,
    pub elapsed: Duration,
}

/// Totals the source server reports for a repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositorySummary {
    pub repo_key:      String,
    pub folders_count: u64,
    pub files_count:   u64,
    pub items_count:   u64,
    pub used_space:    String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StorageInfo {
    repositories_summary_list: Vec<RepositorySummary>,
}

/// Whether `item` changed since it was last sent.
///
/// ```
/// use artiflow_query::{Property, ResultItem};
/// use artiflow_transfer::{TRANSFER_TIMESTAMP, transfer_required};
///
/// let mut item = ResultItem { modified: "2024-01-01T00:00:10.000Z".into(), ..Default::default() };
/// assert!(transfer_required(&item).unwrap());
///
/// item.properties = vec![Property::new(TRANSFER_TIMESTAMP, "1704067200")];
/// assert!(transfer_required(&item).unwrap());
/// item.properties = vec![Property::new(TRANSFER_TIMESTAMP, "1704067210")];
/// assert!(!transfer_required(&item).unwrap());
/// ```
pub fn transfer_required(item: &ResultItem) -> Result<bool> {
    let Some(stamp) = item.property(TRANSFER_TIMESTAMP).filter(|v| !v.is_empty()) else {
        return Ok(true);
    };
    if item.modified.is_empty() {
        return Ok(false);
    }
    let stamp: i64 = stamp.trim().parse().map_err(|e: std::num::ParseIntError| Error::InvalidTimestamp {
        value:  stamp.to_string(),
        reason: e.to_string(),
    })?;
    Ok(parse_modified(&item.modified)?.timestamp() > stamp)
}

fn parse_modified(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp {
            value:  value.to_string(),
            reason: e.to_string(),
        })
}

/// Copies a repository from `source` to the repository of the same name on
/// `dest`.
pub struct RepoSyncEngine<'a, S, D> {
    source:  &'a Endpoint<S>,
    dest:    &'a Endpoint<D>,
    ctx:     &'a TransferContext,
    options: SyncOptions,
}

impl<'a, S: HttpClient, D: HttpClient> RepoSyncEngine<'a, S, D> {
    pub fn new(source: &'a Endpoint<S>, dest: &'a Endpoint<D>, ctx: &'a TransferContext, options: SyncOptions) -> Self {
        Self {
            source,
            dest,
            ctx,
            options,
        }
    }

    pub async fn sync(&self, repo: &str) -> SyncReport {
        tracing::info!(threads = self.options.threads, "Running with {} threads", self.options.threads);
        let started = Instant::now();
        let runner = Runner::new(self.options.threads);
        let report = runner
            .run(self, async {
                runner.queue().push(SyncTask::Folder {
                    repo: repo.to_string(),
                    path: ".".to_string(),
                })
            })
            .await;

        let counts = report.slots.iter().fold(SyncCounts::default(), |total, slot| SyncCounts {
            folders: total.folders + slot.folders,
            files:   total.files + slot.files,
        });
        let elapsed = started.elapsed();
        tracing::info!("Done. Time elapsed: {elapsed:?}");
        SyncReport {
            folders: counts.folders.saturating_sub(1),
            files: counts.files,
            failed: report.tally.failed,
            error: report.error,
            elapsed,
        }
    }

    /// Storage totals of `repo` on the source server.
    pub async fn storage_summary(&self, repo: &str) -> Result<RepositorySummary> {
        let url = self.source.url(STORAGE_INFO_API)?;
        let info: StorageInfo = self
            .source
            .request_expecting(Method::Get, &url, Body::Empty, &[200])
            .await?
            .json()?;
        info.repositories_summary_list
            .into_iter()
            .find(|summary| summary.repo_key == repo)
            .ok_or_else(|| Error::UnknownRepository(repo.to_string()))
    }

    async fn handle_folder(
        &self,
        repo: String,
        path: String,
        worker: &mut Worker<'_, SyncTask, SyncCounts>,
        prefix: &str,
    ) -> Result<()> {
        let shown = if path == "." { repo.clone() } else { format!("{repo}/{path}") };
        tracing::info!("{prefix}Visited folder: {shown}");
        let children = SearchExecutor::new(self.source)
            .exec_aql(&directory_query(&repo, &path))
            .await?;
        for child in children.into_iter().filter(|child| child.name != ".") {
            if child.is_folder() {
                let path = if path == "." { child.name } else { format!("{path}/{}", child.name) };
                worker.push(SyncTask::Folder {
                    repo: repo.clone(),
                    path,
                })?;
            } else {
                worker.push(SyncTask::File(child))?;
            }
        }
        Ok(())
    }

    async fn handle_file(&self, item: ResultItem, prefix: &str) -> Result<()> {
        let relative = item.relative_path();
        tracing::info!("{prefix}Handling file: {relative}");
        if !transfer_required(&item)? {
            tracing::info!("{prefix}File doesn't require transfer: {relative}");
            return Ok(());
        }

        let stamp = Properties::from(vec![Property::new(TRANSFER_TIMESTAMP, Utc::now().timestamp().to_string())]);
        set_properties(self.source, &relative, &stamp).await?;

        let target = deploy_url(self.dest, &relative, &Properties::from(item.properties.clone()))?;
        let checksums = Checksums {
            md5:    item.actual_md5.clone(),
            sha1:   item.actual_sha1.clone(),
            sha256: item.sha256.clone(),
        };
        if item.size >= self.options.min_checksum_deploy && checksum_deploy(self.dest, &target, &checksums).await? {
            tracing::info!("{prefix}Checksum deploy successful: {relative}");
            return Ok(());
        }

        let staging = self.ctx.staging_file(&item.repo, &item.path, &item.name)?;
        tracing::info!("{prefix}Downloading: {relative}");
        let request = DownloadRequest::new(self.source.url(&relative)?, &staging)
            .size(item.size)
            .sha1(Some(item.actual_sha1.clone()).filter(|s| !s.is_empty()));
        Fetcher::new(self.source.client(), self.ctx)
            .with_options(FetchOptions::default().split_count(0))
            .fetch(&request)
            .await?;

        tracing::info!("{prefix}Uploading: {relative}");
        let uploaded = put(self.dest, &target, Body::File(staging.clone()), &checksums, &[]).await;
        artiflow_fs::remove_file_if_exists(&staging)?;
        uploaded?;
        tracing::info!("{prefix}Done: {relative}");
        Ok(())
    }
}

impl<S: HttpClient, D: HttpClient> Handler for RepoSyncEngine<'_, S, D> {
    type Task = SyncTask;
    type Slot = SyncCounts;

    async fn handle(&self, task: SyncTask, worker: &mut Worker<'_, SyncTask, SyncCounts>) -> Result<()> {
        let prefix = log_prefix(worker.id(), false);
        match task {
            SyncTask::Folder { repo, path } => {
                self.handle_folder(repo, path, worker, &prefix).await?;
                worker.slot().folders += 1;
            }
            SyncTask::File(item) => {
                self.handle_file(item, &prefix).await?;
                worker.slot().files += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(modified: &str, stamp: Option<&str>) -> ResultItem {
        ResultItem {
            repo: "libs".into(),
            path: ".".into(),
            name: "a.jar".into(),
            modified: modified.into(),
            properties: stamp
                .map(|s| vec![Property::new(TRANSFER_TIMESTAMP, s)])
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn test_transfer_required_watermark() {
        // 2024-01-01T00:00:00Z
        let base = 1_704_067_200;
        let modified = "2024-01-01T00:00:00.000Z";

        assert!(transfer_required(&stamped(modified, None)).unwrap());
        assert!(transfer_required(&stamped(modified, Some(""))).unwrap());
        assert!(!transfer_required(&stamped(modified, Some(&(base + 60).to_string()))).unwrap());
        assert!(!transfer_required(&stamped(modified, Some(&base.to_string()))).unwrap());
        assert!(transfer_required(&stamped(modified, Some(&(base - 1).to_string()))).unwrap());
    }

    #[test]
    fn test_transfer_required_edge_cases() {
        assert!(!transfer_required(&stamped("", Some("1"))).unwrap());
        assert!(matches!(
            transfer_required(&stamped("2024-01-01T00:00:00.000Z", Some("yesterday"))),
            Err(Error::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            transfer_required(&stamped("not a date", Some("1"))),
            Err(Error::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_parse_modified_offsets() {
        let utc = parse_modified("2024-01-01T02:00:00.000+02:00").unwrap();
        assert_eq!(utc.timestamp(), 1_704_067_200);
        let compact = parse_modified("2024-01-01T02:00:00.000+0200").unwrap();
        assert_eq!(compact, utc);
    }

    #[test]
    fn test_storage_info_shape() {
        let info: StorageInfo = serde_json::from_str(
            r#"{"repositoriesSummaryList":[{"repoKey":"libs","repoType":"LOCAL","foldersCount":4,"filesCount":9,"usedSpace":"1.2 MB","itemsCount":13}]}"#,
        )
        .unwrap();
        assert_eq!(info.repositories_summary_list, vec![RepositorySummary {
            repo_key:      "libs".into(),
            folders_count: 4,
            files_count:   9,
            items_count:   13,
            used_space:    "1.2 MB".into(),
        }]);
    }
}
