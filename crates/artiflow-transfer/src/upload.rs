//! Local files to repository paths.

use std::path::{Path, PathBuf};

use artiflow_fetch::{Body, Endpoint, HttpClient, Method};
use artiflow_fs::{EntryKind, WalkOptions};
use artiflow_query::{
    CommaMode, FileSpec, Properties, Property, SYMLINK_DEST, SYMLINK_SHA1, compile, file_and_dir,
    prepare_local_path_for_upload, root_path, substitute_groups, trim_path,
};
use artiflow_verify::Checksums;
use regex::Regex;

use crate::deploy::{checksum_deploy, deploy_url, file_checksums, put};
use crate::error::{Error, Result};
use crate::options::UploadOptions;
use crate::pool::{Handler, Runner, Worker, log_prefix};
use crate::summary::{TransferSummary, TransferredFile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    File,
    /// Empty artifact standing in for a local symlink.
    Symlink,
    /// Folder created on its own, with no file implying it.
    Dir,
}

/// One local path and where it goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadTask {
    pub local:   PathBuf,
    pub target:  String,
    pub props:   Properties,
    pub kind:    UploadKind,
    pub explode: bool,
}

/// Where `path` lands under `target`: a target ending in `/` is a folder
/// receiving the file name (`flat`) or the whole local path.
///
/// ```
/// use artiflow_transfer::upload_target;
///
/// assert_eq!(upload_target(true, "out/lib/a.jar", "libs/"), "libs/a.jar");
/// assert_eq!(upload_target(false, "out/lib/a.jar", "libs/"), "libs/out/lib/a.jar");
/// assert_eq!(upload_target(false, "out/lib/a.jar", "libs/b.jar"), "libs/b.jar");
/// ```
pub fn upload_target(flat: bool, path: &str, target: &str) -> String {
    if !target.ends_with('/') {
        return target.to_string();
    }
    if flat {
        format!("{target}{}", file_and_dir(path).0)
    } else {
        format!("{target}{}", trim_path(path))
    }
}

/// Expands `spec` into upload tasks, longest local path first.
pub fn plan_uploads(spec: &FileSpec, symlinks: bool) -> Result<Vec<UploadTask>> {
    let mut target = spec.target.clone();
    if !target.contains('/') {
        target.push('/');
    }
    let user_props = match &spec.props {
        Some(props) => Properties::parse(props, CommaMode::Split)?,
        None => Properties::default(),
    };

    let root = root_path(&spec.pattern, spec.regexp);
    let root_meta = std::fs::symlink_metadata(&root).map_err(|_| Error::MissingPath(PathBuf::from(&root)))?;
    let root_is_link = root_meta.file_type().is_symlink();
    if !Path::new(&root).is_dir() || (symlinks && root_is_link) {
        let target = if target.ends_with('/') {
            if spec.flat {
                format!("{target}{}", file_and_dir(&root).0)
            } else {
                trim_path(&format!("{target}{root}"))
            }
        } else {
            target
        };
        let kind = if symlinks && root_is_link { UploadKind::Symlink } else { UploadKind::File };
        return Ok(vec![UploadTask {
            props: with_symlink_props(&user_props, Path::new(&root), kind)?,
            local: PathBuf::from(root),
            target,
            kind,
            explode: spec.explode,
        }]);
    }

    let pattern = compile(&prepare_local_path_for_upload(&spec.pattern, spec.regexp))?;
    let excludes = exclude_regex(&spec.exclusions, spec.regexp, spec.recursive)?;

    let walk = WalkOptions::new()
        .recursive(spec.recursive)
        .include_dirs(true)
        .preserve_symlinks(symlinks);
    let mut entries: Vec<(String, EntryKind)> = artiflow_fs::list_entries(&root, walk)?
        .into_iter()
        .map(|entry| (normalize(&entry.path), entry.kind))
        .collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    let paths: Vec<&str> = entries.iter().map(|(path, _)| path.as_str()).collect();

    let mut tasks = Vec::new();
    // With flat folders only other folders can imply one.
    let mut folder_paths: Vec<&str> = Vec::new();
    for (index, (path, kind)) in entries.iter().enumerate() {
        if excludes.as_ref().is_some_and(|re| re.is_match(path)) {
            continue;
        }
        let symlink_flow = symlinks && *kind == EntryKind::Symlink;
        let is_dir = *kind == EntryKind::Dir || (*kind == EntryKind::Symlink && Path::new(path).is_dir());
        if is_dir && !spec.include_dirs && !symlink_flow {
            continue;
        }
        if !pattern.is_match(path) {
            continue;
        }

        let target = upload_target(spec.flat, path, &substitute_groups(&pattern, path, &target));
        let kind = if symlink_flow {
            UploadKind::Symlink
        } else if is_dir {
            let (siblings, position) = if spec.flat {
                folder_paths.push(path);
                (folder_paths.as_slice(), folder_paths.len() - 1)
            } else {
                (paths.as_slice(), index)
            };
            if path == "." || is_sub_path(siblings, position) {
                continue;
            }
            UploadKind::Dir
        } else {
            UploadKind::File
        };

        tasks.push(UploadTask {
            local: PathBuf::from(path),
            target,
            props: with_symlink_props(&user_props, Path::new(path), kind)?,
            kind,
            explode: spec.explode,
        });
    }
    Ok(tasks)
}

fn normalize(path: &Path) -> String {
    let path = path.to_string_lossy();
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

/// Whether the path sorted right before `index` lives inside `paths[index]`.
fn is_sub_path(paths: &[&str], index: usize) -> bool {
    index > 0
        && paths[index - 1]
            .strip_prefix(paths[index])
            .is_some_and(|rest| rest.starts_with(['/', '\\']))
}

/// One alternation matching any excluded local path.
fn exclude_regex(exclusions: &[String], regexp: bool, recursive: bool) -> Result<Option<Regex>> {
    if exclusions.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = exclusions
        .iter()
        .map(|exclusion| {
            let mut exclusion = exclusion.clone();
            if recursive && exclusion.ends_with(['/', '\\']) {
                exclusion.push('*');
            }
            format!("({})", prepare_local_path_for_upload(&exclusion, regexp))
        })
        .collect();
    Ok(Some(compile(&alternatives.join("|"))?))
}

/// `props` plus the symlink markers of `path` when it is uploaded as a link.
fn with_symlink_props(props: &Properties, path: &Path, kind: UploadKind) -> Result<Properties> {
    let mut props = props.clone();
    if kind != UploadKind::Symlink {
        return Ok(props);
    }
    let link = artiflow_fs::read_link(path)?;
    props.push(Property::new(SYMLINK_DEST, link.to_string_lossy()));
    if path.is_file() {
        let sha1 = Checksums::from_file(path).map_err(|e| Error::checksum(path, e))?.sha1;
        props.push(Property::new(SYMLINK_SHA1, sha1));
    }
    Ok(props)
}

/// Uploads local files matched by file specs.
pub struct Uploader<'a, C> {
    endpoint: &'a Endpoint<C>,
    options:  UploadOptions,
}

impl<'a, C: HttpClient> Uploader<'a, C> {
    pub fn new(endpoint: &'a Endpoint<C>, options: UploadOptions) -> Self { Self { endpoint, options } }

    pub async fn upload(&self, specs: &[FileSpec]) -> Result<TransferSummary> {
        for spec in specs {
            spec.validate()?;
        }
        let transfer = self.options.transfer;
        let runner = Runner::new(transfer.threads).fail_fast(transfer.fail_fast);
        let report = runner
            .run(self, async {
                for spec in specs {
                    for task in plan_uploads(spec, self.options.symlinks)? {
                        runner.queue().push(task)?;
                    }
                }
                Ok::<(), Error>(())
            })
            .await;

        let summary = TransferSummary::from(report);
        tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "uploaded {} artifacts", summary.succeeded);
        Ok(summary)
    }

    async fn upload_file(&self, task: UploadTask, prefix: &str) -> Result<TransferredFile> {
        let dry_run = self.options.transfer.dry_run;
        tracing::info!("{prefix}Uploading artifact: {}", task.local.display());
        let url = deploy_url(self.endpoint, &task.target, &task.props)?;

        if task.kind == UploadKind::Symlink {
            let checksums = Checksums::from_bytes(b"");
            if !dry_run {
                put(self.endpoint, &url, Body::Empty, &checksums, &[]).await?;
            }
            return Ok(self.record(task, checksums));
        }

        let size = std::fs::metadata(&task.local)
            .map_err(|e| artiflow_fs::Error::read(&task.local, e))?
            .len();
        let checksums = file_checksums(&task.local).await?;
        let mut extra = Vec::new();
        if task.explode {
            extra.push(("X-Explode-Archive".to_string(), "true".to_string()));
        }

        let mut deployed = false;
        if size >= self.options.min_checksum_deploy && !task.explode && !dry_run {
            deployed = checksum_deploy(self.endpoint, &url, &checksums).await?;
            if deployed {
                tracing::debug!("{prefix}Checksum deploy: {}", task.target);
            }
        }
        if !deployed && !dry_run {
            put(self.endpoint, &url, Body::File(task.local.clone()), &checksums, &extra).await?;
        }
        Ok(self.record(task, checksums))
    }

    /// Folder creation never fails the batch.
    async fn create_folder(&self, task: &UploadTask, prefix: &str) {
        let mut target = task.target.clone();
        if !target.ends_with('/') {
            target.push('/');
        }
        if self.options.transfer.dry_run {
            tracing::info!("{prefix}Creating folder: {target}");
            return;
        }
        let result = match self.endpoint.url(&target) {
            Ok(url) => self.endpoint.request(Method::Put, &url, &[], Body::Empty).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(response) => tracing::debug!(status = response.status, "{prefix}Uploaded directory: {target}"),
            Err(e) => tracing::warn!("{prefix}Failed creating folder {target}: {e}"),
        }
    }

    fn record(&self, task: UploadTask, checksums: Checksums) -> TransferredFile {
        TransferredFile {
            local_path: task.local,
            remote_path: task.target,
            checksums,
        }
    }
}

impl<C: HttpClient> Handler for Uploader<'_, C> {
    type Task = UploadTask;
    type Slot = Vec<TransferredFile>;

    async fn handle(&self, task: UploadTask, worker: &mut Worker<'_, UploadTask, Vec<TransferredFile>>) -> Result<()> {
        let prefix = log_prefix(worker.id(), self.options.transfer.dry_run);
        if task.kind == UploadKind::Dir {
            self.create_folder(&task, &prefix).await;
            return Ok(());
        }
        let file = self.upload_file(task, &prefix).await?;
        worker.slot().push(file);
        Ok(())
    }

    /// A rejected upload is logged and counted, not recorded as the run error.
    fn is_fatal(&self, error: &Error) -> bool { !error.is_status() }
}
