//! Maps each subcommand onto its library operation.

use anyhow::{Context, Result, bail};
use artiflow_fetch::{Endpoint, ReqwestClient, RetryingClient};
use artiflow_fs::TransferContext;
use artiflow_query::{FileSpec, ResultItem, SearchExecutor};
use artiflow_transfer::{
    DeleteService, DownloadOptions, Downloader, MoveCopyService, MoveType, PropsService, RepoSyncEngine, SyncOptions,
    TransferOptions, TransferSummary, UploadOptions, Uploader,
};
use tracing::{info, warn};

use crate::cli::{
    App, Commands, DeleteArg, DownloadArg, MoveArg, PropsArg, SearchArg, SyncArg, TransferArg, UploadArg,
};
use crate::config::{Config, ServerConfig};

type Client = RetryingClient<ReqwestClient>;

pub async fn run(app: App) -> Result<()> {
    let config = Config::load(app.config.as_deref())?;
    let server = config.server(app.server_id.as_deref())?;
    let endpoint = connect(&config, server)?;
    info!(server = %server.id, url = %server.url, "using server");

    match app.cmd {
        Commands::Search(arg) => search(&endpoint, &arg).await,
        Commands::Upload(arg) => upload(&config, &endpoint, &arg).await,
        Commands::Download(arg) => download(&config, &endpoint, &arg).await,
        Commands::Move(arg) => move_or_copy(&endpoint, &arg, MoveType::Move).await,
        Commands::Copy(arg) => move_or_copy(&endpoint, &arg, MoveType::Copy).await,
        Commands::Delete(arg) => delete(&config, &endpoint, &arg).await,
        Commands::SetProps(arg) => props(&config, &endpoint, &arg, Change::Set).await,
        Commands::DeleteProps(arg) => props(&config, &endpoint, &arg, Change::Delete).await,
        Commands::Sync(arg) => sync(&config, &endpoint, &arg).await,
    }
}

fn connect(config: &Config, server: &ServerConfig) -> Result<Endpoint<Client>> {
    let client = ReqwestClient::new()?.credentials(server.credentials());
    let client = RetryingClient::new(client, config.retries, config.retry_wait());
    Endpoint::new(client, &server.url).with_context(|| format!("Invalid url for server '{}'", server.id))
}

fn transfer_options(config: &Config, arg: &TransferArg) -> TransferOptions {
    TransferOptions::default()
        .threads(arg.threads.unwrap_or(config.threads).max(1))
        .dry_run(arg.dry_run)
        .fail_fast(arg.fail_fast)
}

async fn find(endpoint: &Endpoint<Client>, specs: &[FileSpec]) -> Result<Vec<ResultItem>> {
    let search = SearchExecutor::new(endpoint);
    let mut items = Vec::new();
    for spec in specs {
        items.extend(search.search(spec).await?);
    }
    Ok(items)
}

async fn search(endpoint: &Endpoint<Client>, arg: &SearchArg) -> Result<()> {
    let specs = arg.spec.specs(|spec| spec.include_dirs(arg.include_dirs))?;
    let items = find(endpoint, &specs).await?;
    if arg.count {
        println!("{}", items.len());
    } else {
        println!("{}", serde_json::to_string_pretty(&items)?);
    }
    Ok(())
}

async fn upload(config: &Config, endpoint: &Endpoint<Client>, arg: &UploadArg) -> Result<()> {
    let target = arg.target.clone().unwrap_or_default();
    let specs = arg.spec.specs(|spec| {
        spec.target(target.as_str())
            .flat(arg.flat)
            .include_dirs(arg.include_dirs)
            .explode(arg.explode)
    })?;
    let options = UploadOptions::default()
        .transfer(transfer_options(config, &arg.transfer))
        .min_checksum_deploy(config.min_checksum_deploy())
        .symlinks(arg.symlinks);
    let summary = Uploader::new(endpoint, options).upload(&specs).await?;
    finish("Uploaded", summary)
}

async fn download(config: &Config, endpoint: &Endpoint<Client>, arg: &DownloadArg) -> Result<()> {
    let target = arg.target.clone().unwrap_or_default();
    let specs = arg.spec.specs(|spec| {
        spec.target(target.as_str())
            .flat(arg.flat)
            .include_dirs(arg.include_dirs)
            .explode(arg.explode)
    })?;
    let min_split = match arg.min_split {
        Some(kb) => Some(kb * 1000),
        None => config.min_split_size(),
    };
    let options = DownloadOptions::default()
        .transfer(transfer_options(config, &arg.transfer))
        .split_count(arg.split_count.unwrap_or(config.split_count))
        .min_split_size(min_split)
        .symlinks(arg.symlinks)
        .validate_symlinks(arg.validate_symlinks);
    let ctx = TransferContext::new()?;
    let summary = Downloader::new(endpoint, &ctx, options).download(&specs).await?;
    finish("Downloaded", summary)
}

async fn move_or_copy(endpoint: &Endpoint<Client>, arg: &MoveArg, move_type: MoveType) -> Result<()> {
    let specs = arg.spec.specs(|spec| spec.target(arg.target.as_str()).flat(arg.flat))?;
    let service = MoveCopyService::new(endpoint, move_type).dry_run(arg.dry_run);
    let mut total = TransferSummary::default();
    for spec in &specs {
        merge(&mut total, service.move_files(spec).await?);
    }
    finish(move_type.moved(), total)
}

async fn delete(config: &Config, endpoint: &Endpoint<Client>, arg: &DeleteArg) -> Result<()> {
    let specs = arg.spec.specs(|spec| spec)?;
    let service = DeleteService::new(endpoint, transfer_options(config, &arg.transfer));
    let mut total = TransferSummary::default();
    for spec in &specs {
        merge(&mut total, service.delete(spec).await?);
    }
    finish("Deleted", total)
}

#[derive(Clone, Copy)]
enum Change {
    Set,
    Delete,
}

async fn props(config: &Config, endpoint: &Endpoint<Client>, arg: &PropsArg, change: Change) -> Result<()> {
    let specs = arg.spec.specs(|spec| spec.include_dirs(arg.include_dirs))?;
    let items = find(endpoint, &specs).await?;
    if items.is_empty() {
        warn!("no items matched, nothing to change");
        return Ok(());
    }
    let service = PropsService::new(endpoint, transfer_options(config, &arg.transfer));
    let summary = match change {
        Change::Set => service.set_props(items, &arg.properties).await?,
        Change::Delete => service.delete_props(items, &arg.properties).await?,
    };
    finish("Updated", summary)
}

async fn sync(config: &Config, source: &Endpoint<Client>, arg: &SyncArg) -> Result<()> {
    let target = config.server(Some(arg.target_server.as_str()))?;
    let dest = connect(config, target)?;
    let mut options = SyncOptions::default();
    if let Some(threads) = arg.threads {
        options = options.threads(threads.max(1));
    }
    if let Some(kb) = arg.min_checksum_deploy {
        options = options.min_checksum_deploy(kb * 1024);
    }

    let ctx = TransferContext::new()?;
    let engine = RepoSyncEngine::new(source, &dest, &ctx, options);
    let report = engine.sync(&arg.repo).await;
    info!(
        folders = report.folders,
        files = report.files,
        failed = report.failed,
        "synced {} in {:?}",
        arg.repo,
        report.elapsed
    );
    match engine.storage_summary(&arg.repo).await {
        Ok(summary) => info!(
            folders = summary.folders_count,
            files = summary.files_count,
            items = summary.items_count,
            used_space = %summary.used_space,
            "source storage summary"
        ),
        Err(e) => warn!("could not read the storage summary: {e}"),
    }

    if let Some(error) = report.error {
        bail!("{} files failed to sync, first error: {error}", report.failed);
    }
    if report.failed > 0 {
        bail!("{} files failed to sync", report.failed);
    }
    Ok(())
}

fn merge(total: &mut TransferSummary, next: TransferSummary) {
    total.succeeded += next.succeeded;
    total.failed += next.failed;
    total.files.extend(next.files);
    if total.error.is_none() {
        total.error = next.error;
    }
}

fn finish(done: &str, summary: TransferSummary) -> Result<()> {
    info!(succeeded = summary.succeeded, failed = summary.failed, "{done} {} items", summary.succeeded);
    if let Some(error) = summary.error {
        bail!("{} items failed, first error: {error}", summary.failed);
    }
    if summary.failed > 0 {
        bail!("{} items failed", summary.failed);
    }
    Ok(())
}
