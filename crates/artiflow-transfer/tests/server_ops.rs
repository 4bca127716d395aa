mod common;

use artiflow_fetch::{Endpoint, Method};
use artiflow_query::{FileSpec, ItemType, ResultItem};
use artiflow_transfer::{DeleteService, Error, MoveCopyService, MoveType, PropsService, TransferOptions};
use common::{RepoServer, TestResult, item, results};

const BASE: &str = "http://repo.example/artifactory";

fn result_item(path: &str, name: &str) -> ResultItem {
    ResultItem {
        repo: "libs".into(),
        path: path.into(),
        name: name.into(),
        item_type: ItemType::File,
        ..Default::default()
    }
}

#[tokio::test]
async fn move_folder_creates_destination_first() -> TestResult {
    let found = results(vec![item("libs", "a", "b", "folder"), item("libs", "a/b", "x.jar", "file")]);
    let server = RepoServer::new()
        .route(Method::Post, "items.find", 200, &found)
        .route(Method::Put, "dest/", 201, "")
        .route(Method::Post, "api/move", 200, "");
    let endpoint = Endpoint::new(server, BASE)?;

    let summary = MoveCopyService::new(&endpoint, MoveType::Move)
        .move_files(&FileSpec::new("libs/a/").target("dest/"))
        .await?;
    assert_eq!((summary.succeeded, summary.failed), (1, 0));
    assert!(summary.error.is_none());

    let requests = endpoint.client().requests();
    let urls: Vec<&str> = requests.iter().skip(1).map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![
        format!("{BASE}/dest/a/"),
        format!("{BASE}/api/move/libs/a/b/?to=dest%2Fa%2F"),
    ]);
    Ok(())
}

#[tokio::test]
async fn failed_copies_are_reported_with_counts() -> TestResult {
    let found = results(vec![item("libs", "a", "x.jar", "file"), item("libs", "a", "y.jar", "file")]);
    let server = RepoServer::new()
        .route(Method::Post, "items.find", 200, &found)
        .route(Method::Post, "y.jar", 404, "{\"errors\":[]}")
        .route(Method::Post, "api/copy", 200, "");
    let endpoint = Endpoint::new(server, BASE)?;

    let summary = MoveCopyService::new(&endpoint, MoveType::Copy)
        .dry_run(true)
        .move_files(&FileSpec::new("libs/a/*.jar").target("dest/"))
        .await?;
    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    assert!(matches!(summary.error, Some(Error::Failed { operation: "copying", count: 1 })));

    let posts = endpoint.client().sent(Method::Post);
    assert_eq!(posts[1].url, format!("{BASE}/api/copy/libs/a/x.jar?to=dest%2Fa%2Fx.jar&dry=1"));
    Ok(())
}

#[tokio::test]
async fn delete_removes_outermost_items() -> TestResult {
    let found = results(vec![
        item("libs", "a", "b", "folder"),
        item("libs", "a/b", "y.jar", "file"),
        item("libs", "a", "x.jar", "file"),
    ]);
    let server = RepoServer::new()
        .route(Method::Post, "items.find", 200, &found)
        .route(Method::Delete, "libs/a/x.jar", 204, "")
        .route(Method::Delete, "libs/a/b/", 403, "");
    let endpoint = Endpoint::new(server, BASE)?;

    let service = DeleteService::new(&endpoint, TransferOptions::default());
    let items = service.paths_to_delete(&FileSpec::new("libs/a/*")).await?;
    let paths: Vec<String> = items.iter().map(ResultItem::relative_path).collect();
    assert_eq!(paths, vec!["libs/a/b/", "libs/a/x.jar"]);

    let summary = service.delete_files(items).await;
    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    assert!(summary.error.is_none());
    assert_eq!(endpoint.client().sent(Method::Delete).len(), 2);
    Ok(())
}

#[tokio::test]
async fn dry_run_delete_sends_nothing() -> TestResult {
    let endpoint = Endpoint::new(RepoServer::new(), BASE)?;
    let service = DeleteService::new(&endpoint, TransferOptions::default().dry_run(true));
    let summary = service.delete_files(vec![result_item("a", "x.jar")]).await;
    assert_eq!(summary.succeeded, 1);
    assert!(endpoint.client().requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn set_and_delete_properties() -> TestResult {
    let server = RepoServer::new()
        .route(Method::Put, "api/storage", 204, "")
        .route(Method::Delete, "api/storage", 204, "");
    let endpoint = Endpoint::new(server, BASE)?;
    let service = PropsService::new(&endpoint, TransferOptions::default());
    let items = vec![result_item("a", "x.jar"), result_item(".", "y.jar")];

    let set = service.set_props(items.clone(), "env=prod;team=core").await?;
    assert_eq!(set.succeeded, 2);
    let mut urls: Vec<String> = endpoint.client().sent(Method::Put).into_iter().map(|r| r.url).collect();
    urls.sort();
    assert_eq!(urls, vec![
        format!("{BASE}/api/storage/libs/a/x.jar?properties=env=prod;team=core"),
        format!("{BASE}/api/storage/libs/y.jar?properties=env=prod;team=core"),
    ]);

    let deleted = service.delete_props(items, "env,team").await?;
    assert_eq!(deleted.succeeded, 2);
    let deletes = endpoint.client().sent(Method::Delete);
    assert!(deletes.iter().all(|r| r.url.ends_with("?properties=env,team")));
    Ok(())
}

#[tokio::test]
async fn property_failure_stops_the_run() -> TestResult {
    let server = RepoServer::new().route(Method::Put, "api/storage", 500, "boom");
    let endpoint = Endpoint::new(server, BASE)?;
    let service = PropsService::new(&endpoint, TransferOptions::default().threads(1));
    let items = vec![result_item("a", "x.jar"), result_item("a", "y.jar"), result_item("a", "z.jar")];

    let summary = service.set_props(items, "env=prod").await?;
    assert_eq!(summary.succeeded, 0);
    assert!(summary.error.as_ref().is_some_and(|e| e.status() == Some(500)));
    assert_eq!(endpoint.client().requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_properties_fail_before_any_request() -> TestResult {
    let endpoint = Endpoint::new(RepoServer::new(), BASE)?;
    let service = PropsService::new(&endpoint, TransferOptions::default());
    let result = service.set_props(vec![result_item("a", "x.jar")], "novalue").await;
    assert!(matches!(result, Err(Error::Query(_))));
    assert!(endpoint.client().requests().is_empty());
    Ok(())
}
