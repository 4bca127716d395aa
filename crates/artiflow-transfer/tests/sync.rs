mod common;

use artiflow_fetch::{Endpoint, Method};
use artiflow_fs::TransferContext;
use artiflow_transfer::{Error, RepoSyncEngine, SyncOptions, TRANSFER_TIMESTAMP};
use artiflow_verify::Checksums;
use common::{Journal, RepoServer, TestResult, item, results};

const SOURCE: &str = "http://source.example/artifactory";
const DEST: &str = "http://dest.example/artifactory";
// 2024-01-01T00:00:00Z
const MODIFIED: &str = "2024-01-01T00:00:00.000Z";
const MODIFIED_UNIX: i64 = 1_704_067_200;

fn file(path: &str, name: &str, content: &[u8], stamp: Option<i64>) -> serde_json::Value {
    let checksums = Checksums::from_bytes(content);
    let mut entry = item("libs", path, name, "file");
    entry["size"] = content.len().into();
    entry["actual_md5"] = checksums.md5.into();
    entry["actual_sha1"] = checksums.sha1.into();
    entry["sha256"] = checksums.sha256.into();
    entry["modified"] = MODIFIED.into();
    if let Some(stamp) = stamp {
        entry["properties"] = serde_json::json!([{ "key": TRANSFER_TIMESTAMP, "value": stamp.to_string() }]);
    }
    entry
}

/// `libs` holds `top.bin` (never copied, large enough for a checksum
/// deploy) and folder `a` with `old.bin` (copied after its last change)
/// and `new.bin` (changed since it was last copied).
fn servers(journal: &Journal) -> (RepoServer, RepoServer) {
    let big = vec![b'b'; 4096];
    let root = results(vec![
        item("libs", ".", ".", "folder"),
        item("libs", ".", "a", "folder"),
        file(".", "top.bin", &big, None),
    ]);
    let folder = results(vec![
        file("a", "old.bin", b"old", Some(MODIFIED_UNIX + 60)),
        file("a", "new.bin", b"new", Some(MODIFIED_UNIX - 60)),
    ]);
    let source = RepoServer::new()
        .journal(journal.clone())
        .route(Method::Post, r#""path":{"$match":"."}"#, 200, &root)
        .route(Method::Post, r#""path":{"$match":"a"}"#, 200, &folder)
        .route(Method::Put, "api/storage", 204, "")
        .file(&format!("{SOURCE}/libs/top.bin"), big)
        .file(&format!("{SOURCE}/libs/a/new.bin"), b"new".to_vec());
    let dest = RepoServer::new()
        .journal(journal.clone())
        .checksum_deploy(201)
        .route(Method::Put, "libs/", 201, "");
    (source, dest)
}

fn position(journal: &Journal, method: Method, prefix: &str, needle: &str) -> Option<usize> {
    journal
        .lock()
        .unwrap()
        .iter()
        .position(|r| r.method == method && r.url.starts_with(prefix) && r.url.contains(needle))
}

#[tokio::test]
async fn sync_copies_only_changed_files() -> TestResult {
    let journal = Journal::default();
    let (source, dest) = servers(&journal);
    let source = Endpoint::new(source, SOURCE)?;
    let dest = Endpoint::new(dest, DEST)?;
    let scratch = tempfile::tempdir()?;
    let ctx = TransferContext::new_in(scratch.path())?;

    let report = RepoSyncEngine::new(&source, &dest, &ctx, SyncOptions::default().threads(4))
        .sync("libs")
        .await;
    assert!(report.error.is_none(), "{:?}", report.error);
    assert_eq!(report.folders, 1);
    assert_eq!(report.files, 3);
    assert_eq!(report.failed, 0);

    let stamp = format!("?properties={TRANSFER_TIMESTAMP}=");
    let stamped: Vec<String> = journal
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == Method::Put && r.url.contains(&stamp))
        .map(|r| r.url.clone())
        .collect();
    assert_eq!(stamped.len(), 2);
    assert!(position(&journal, Method::Put, SOURCE, "old.bin").is_none());
    assert!(position(&journal, Method::Put, DEST, "old.bin").is_none());

    // Large enough for a checksum deploy, which the destination accepts.
    let deploys: Vec<_> = dest
        .client()
        .sent(Method::Put)
        .into_iter()
        .filter(|r| r.url.starts_with(DEST))
        .collect();
    let top: Vec<_> = deploys.iter().filter(|r| r.url.contains("libs/top.bin")).collect();
    assert_eq!(top.len(), 1);
    assert!(top[0].is_checksum_deploy());

    // Small files are downloaded and sent in full, with the source properties.
    let new: Vec<_> = deploys.iter().filter(|r| r.url.contains("libs/a/new.bin")).collect();
    assert_eq!(new.len(), 1);
    assert!(!new[0].is_checksum_deploy());
    assert_eq!(new[0].body_len, 3);
    assert!(new[0].url.contains(&format!(";{TRANSFER_TIMESTAMP}=")));

    assert!(!ctx.path().join("libs/a/new.bin").exists());
    Ok(())
}

#[tokio::test]
async fn source_is_stamped_before_the_copy() -> TestResult {
    let journal = Journal::default();
    let (source, dest) = servers(&journal);
    let source = Endpoint::new(source, SOURCE)?;
    let dest = Endpoint::new(dest, DEST)?;
    let scratch = tempfile::tempdir()?;
    let ctx = TransferContext::new_in(scratch.path())?;

    RepoSyncEngine::new(&source, &dest, &ctx, SyncOptions::default())
        .sync("libs")
        .await;

    let stamp_new = position(&journal, Method::Put, SOURCE, "api/storage/libs/a/new.bin").unwrap();
    let download_new = position(&journal, Method::Get, SOURCE, "libs/a/new.bin").unwrap();
    let upload_new = position(&journal, Method::Put, DEST, "libs/a/new.bin").unwrap();
    assert!(stamp_new < download_new);
    assert!(download_new < upload_new);

    let stamp_top = position(&journal, Method::Put, SOURCE, "api/storage/libs/top.bin").unwrap();
    let deploy_top = position(&journal, Method::Put, DEST, "libs/top.bin").unwrap();
    assert!(stamp_top < deploy_top);
    Ok(())
}

#[tokio::test]
async fn failed_upload_is_reported() -> TestResult {
    let journal = Journal::default();
    let (source, _) = servers(&journal);
    let dest = RepoServer::new().route(Method::Put, "libs/", 500, "down");
    let source = Endpoint::new(source, SOURCE)?;
    let dest = Endpoint::new(dest, DEST)?;
    let scratch = tempfile::tempdir()?;
    let ctx = TransferContext::new_in(scratch.path())?;

    let report = RepoSyncEngine::new(&source, &dest, &ctx, SyncOptions::default())
        .sync("libs")
        .await;
    assert_eq!(report.failed, 2);
    assert_eq!(report.files, 1);
    assert!(report.error.as_ref().is_some_and(|e| e.status() == Some(500)));
    Ok(())
}

#[tokio::test]
async fn storage_summary_reads_the_repository_totals() -> TestResult {
    let info = r#"{"repositoriesSummaryList":[
        {"repoKey":"other","foldersCount":1,"filesCount":1,"itemsCount":2,"usedSpace":"1 KB"},
        {"repoKey":"libs","foldersCount":2,"filesCount":3,"itemsCount":5,"usedSpace":"4.1 KB"}
    ]}"#;
    let source = Endpoint::new(RepoServer::new().route(Method::Get, "api/storageinfo", 200, info), SOURCE)?;
    let dest = Endpoint::new(RepoServer::new(), DEST)?;
    let scratch = tempfile::tempdir()?;
    let ctx = TransferContext::new_in(scratch.path())?;
    let engine = RepoSyncEngine::new(&source, &dest, &ctx, SyncOptions::default());

    let summary = engine.storage_summary("libs").await?;
    assert_eq!((summary.folders_count, summary.files_count, summary.items_count), (2, 3, 5));
    assert_eq!(summary.used_space, "4.1 KB");
    assert!(matches!(engine.storage_summary("missing").await, Err(Error::UnknownRepository(_))));
    Ok(())
}
