use url::Url;

use crate::error::{Error, Result};
use crate::http::{Body, HttpClient, Method, Response};

/// A repository server: its base URL plus the client used to reach it.
#[derive(Clone, Debug)]
pub struct Endpoint<C> {
    client:   C,
    base_url: Url,
}

impl<C: HttpClient> Endpoint<C> {
    pub fn new(client: C, base_url: &str) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn client(&self) -> &C { &self.client }

    pub fn base_url(&self) -> &str { self.base_url.as_str() }

    /// Absolute URL for a server-relative path. Each segment is
    /// percent-encoded; a trailing `/` is preserved.
    pub fn url(&self, path: &str) -> Result<String> { self.url_with_query(path, &[]) }

    pub fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if path.ends_with('/') {
                segments.push("");
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    /// Like [`Endpoint::url`] but with a query string that is already encoded.
    pub fn url_with_raw_query(&self, path: &str, query: &str) -> Result<String> {
        let mut url = Url::parse(&self.url(path)?).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        url.set_query(Some(query).filter(|q| !q.is_empty()));
        Ok(url.into())
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Body,
    ) -> Result<Response> {
        tracing::debug!(method = method.as_str(), url, "sending request");
        self.client.send(method, url, headers, body).await
    }

    /// Sends to `url` and fails unless the status is one of `expected`.
    pub async fn request_expecting(
        &self,
        method: Method,
        url: &str,
        body: Body,
        expected: &[u16],
    ) -> Result<Response> {
        self.request(method, url, &[], body)
            .await?
            .expect_status(url, expected)
    }
}
