#![cfg(feature = "reqwest")]

use artiflow_fetch::{
    Body, DownloadMode, DownloadRequest, Endpoint, FetchOptions, Fetcher, HttpClient, Method, ReqwestClient,
};
use artiflow_fs::TransferContext;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn put_sends_headers_and_body() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/libs-local/a/b.txt"))
        .and(header("X-Checksum-Sha1", "abc"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = Endpoint::new(ReqwestClient::new()?, &server.uri())?;
    let url = endpoint.url("libs-local/a/b.txt")?;
    let headers = vec![("X-Checksum-Sha1".to_string(), "abc".to_string())];
    let response = endpoint
        .client()
        .send(Method::Put, &url, &headers, Body::from("payload"))
        .await?;
    assert_eq!(response.status, 201);
    Ok(())
}

#[tokio::test]
async fn ranged_download_against_http_server() -> TestResult {
    let data: Vec<u8> = (0..12u8).collect();
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/repo/file.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("Accept-Ranges", "bytes"))
        .mount(&server)
        .await;
    for (range, slice) in [("bytes=0-3", &data[0..4]), ("bytes=4-7", &data[4..8]), ("bytes=8-11", &data[8..12])] {
        Mock::given(method("GET"))
            .and(path("/repo/file.bin"))
            .and(header("Range", range))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(slice.to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = ReqwestClient::new()?;
    let dir = tempfile::tempdir()?;
    let ctx = TransferContext::new_in(dir.path().join("tmp"))?;
    let dest = dir.path().join("file.bin");
    let request = DownloadRequest::new(format!("{}/repo/file.bin", server.uri()), &dest).size(12);

    let mode = Fetcher::new(&client, &ctx)
        .with_options(FetchOptions::default().split_count(3).min_split_size(Some(1)))
        .fetch(&request)
        .await?;

    assert_eq!(mode, DownloadMode::Ranged { chunks: 3 });
    assert_eq!(std::fs::read(&dest)?, data);
    Ok(())
}
