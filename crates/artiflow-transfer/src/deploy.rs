//! Requests shared by the operations that write to a repository.

use std::path::{Path, PathBuf};

use artiflow_fetch::{Body, Endpoint, Headers, HttpClient, Method, Response};
use artiflow_query::Properties;
use artiflow_verify::Checksums;

use crate::error::{Error, Result};

const STORAGE_API: &str = "api/storage";

/// Deploy URL of `target` with `props` as matrix parameters.
pub(crate) fn deploy_url<C: HttpClient>(endpoint: &Endpoint<C>, target: &str, props: &Properties) -> Result<String> {
    Ok(format!("{}{}", endpoint.url(target)?, props.to_matrix_params()))
}

pub(crate) fn checksum_headers(checksums: &Checksums) -> Headers {
    [
        ("X-Checksum-Sha1", &checksums.sha1),
        ("X-Checksum-Md5", &checksums.md5),
        ("X-Checksum", &checksums.sha256),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(key, value)| (key.to_string(), value.clone()))
    .collect()
}

/// Asks the server to deploy content it already stores. Returns whether it
/// did; any status other than 200/201 means the bytes have to be sent.
pub(crate) async fn checksum_deploy<C: HttpClient>(
    endpoint: &Endpoint<C>,
    url: &str,
    checksums: &Checksums,
) -> Result<bool> {
    let mut headers = vec![("X-Checksum-Deploy".to_string(), "true".to_string())];
    headers.extend(checksum_headers(checksums));
    let response = endpoint.request(Method::Put, url, &headers, Body::Empty).await?;
    tracing::debug!(status = response.status, url, "checksum deploy responded");
    Ok(matches!(response.status, 200 | 201))
}

/// Sends `body` to `url`, failing on anything but 200/201.
pub(crate) async fn put<C: HttpClient>(
    endpoint: &Endpoint<C>,
    url: &str,
    body: Body,
    checksums: &Checksums,
    extra: &[(String, String)],
) -> Result<Response> {
    let mut headers = checksum_headers(checksums);
    headers.extend_from_slice(extra);
    let response = endpoint
        .request(Method::Put, url, &headers, body)
        .await?
        .expect_status(url, &[200, 201])?;
    tracing::debug!(status = response.status, url, "deploy responded");
    Ok(response)
}

/// Sets `props` on the item at `relative_path`.
pub(crate) async fn set_properties<C: HttpClient>(
    endpoint: &Endpoint<C>,
    relative_path: &str,
    props: &Properties,
) -> Result<()> {
    let url = storage_url(endpoint, relative_path, &props.to_encoded_string())?;
    endpoint.request_expecting(Method::Put, &url, Body::Empty, &[204]).await?;
    Ok(())
}

/// Removes the properties named in `encoded_keys` from the item at `relative_path`.
pub(crate) async fn delete_properties<C: HttpClient>(
    endpoint: &Endpoint<C>,
    relative_path: &str,
    encoded_keys: &str,
) -> Result<()> {
    let url = storage_url(endpoint, relative_path, encoded_keys)?;
    endpoint.request_expecting(Method::Delete, &url, Body::Empty, &[204]).await?;
    Ok(())
}

fn storage_url<C: HttpClient>(endpoint: &Endpoint<C>, relative_path: &str, encoded: &str) -> Result<String> {
    let path = format!("{STORAGE_API}/{relative_path}");
    Ok(endpoint.url_with_raw_query(&path, &format!("properties={encoded}"))?)
}

/// md5, sha1 and sha256 of a local file, hashed off the async workers.
pub(crate) async fn file_checksums(path: &Path) -> Result<Checksums> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || Checksums::from_file(&path).map_err(|e| Error::checksum(&path, e)))
        .await
        .map_err(|e| Error::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_headers_skip_missing() {
        let checksums = Checksums {
            md5:    "m".into(),
            sha1:   "s".into(),
            sha256: String::new(),
        };
        let headers = checksum_headers(&checksums);
        assert_eq!(headers, vec![
            ("X-Checksum-Sha1".to_string(), "s".to_string()),
            ("X-Checksum-Md5".to_string(), "m".to_string()),
        ]);
    }

    #[tokio::test]
    async fn test_file_checksums() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc")?;
        let checksums = file_checksums(&path).await?;
        assert_eq!(checksums, Checksums::from_bytes(b"abc"));
        assert!(matches!(
            file_checksums(&dir.path().join("missing")).await,
            Err(Error::Checksum { .. })
        ));
        Ok(())
    }
}
