use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

pub type Headers = Vec<(String, String)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Request payload. Files are streamed from disk and can be re-opened, so a
/// body can be replayed by a retrying client.
#[derive(Clone, Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    File(PathBuf),
}

impl From<String> for Body {
    fn from(value: String) -> Self { Self::Bytes(Bytes::from(value)) }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self { Self::Bytes(Bytes::from_static(value.as_bytes())) }
}

pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Fully buffered response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status:  u16,
    pub headers: Headers,
    pub body:    Bytes,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> { find_header(&self.headers, name) }

    pub fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Turns any status outside `expected` into [`Error::Status`].
    pub fn expect_status(self, url: &str, expected: &[u16]) -> Result<Self> {
        if expected.contains(&self.status) {
            Ok(self)
        } else {
            Err(Error::Status {
                status: self.status,
                url:    url.to_string(),
                body:   self.text(),
            })
        }
    }
}

/// Response whose body has not been read yet.
pub struct StreamResponse {
    pub status:  u16,
    pub headers: Headers,
    pub body:    BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl StreamResponse {
    pub fn header(&self, name: &str) -> Option<&str> { find_header(&self.headers, name) }

    pub async fn into_bytes(mut self) -> Result<Bytes> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }

    pub async fn expect_status(self, url: &str, expected: &[u16]) -> Result<Self> {
        if expected.contains(&self.status) {
            return Ok(self);
        }
        let status = self.status;
        let body = self
            .into_bytes()
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        Err(Error::Status {
            status,
            url: url.to_string(),
            body,
        })
    }
}

/// Transport used by every remote operation. Implementations only move bytes;
/// status interpretation stays with the caller.
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Body,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// GET whose body is consumed incrementally.
    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<StreamResponse>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Body,
    ) -> impl Future<Output = Result<Response>> + Send {
        (**self).send(method, url, headers, body)
    }

    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<StreamResponse>> + Send {
        (**self).stream(url, headers)
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{Credentials, ReqwestClient};

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use std::time::Duration;
    use tokio_util::io::ReaderStream;

    #[derive(Clone, Debug, Default)]
    pub enum Credentials {
        #[default]
        None,
        Basic {
            user:     String,
            password: String,
        },
        Bearer(String),
    }

    /// Production HTTP client implementation using reqwest.
    #[derive(Clone, Debug)]
    pub struct ReqwestClient {
        client:      reqwest::Client,
        credentials: Credentials,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self> { Self::with_timeout(None) }

        pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
            let mut builder = reqwest::Client::builder()
                .user_agent(concat!("artiflow/", env!("CARGO_PKG_VERSION")));
            if let Some(timeout) = timeout {
                builder = builder.connect_timeout(timeout);
            }
            let client = builder.build().map_err(|e| Error::Network(e.to_string()))?;
            Ok(Self {
                client,
                credentials: Credentials::None,
            })
        }

        #[must_use]
        pub fn credentials(mut self, credentials: Credentials) -> Self {
            self.credentials = credentials;
            self
        }

        fn request(
            &self,
            method: Method,
            url: &str,
            headers: &[(String, String)],
        ) -> reqwest::RequestBuilder {
            let method = match method {
                Method::Get => reqwest::Method::GET,
                Method::Head => reqwest::Method::HEAD,
                Method::Put => reqwest::Method::PUT,
                Method::Post => reqwest::Method::POST,
                Method::Delete => reqwest::Method::DELETE,
            };
            let mut request = self.client.request(method, url);
            for (key, value) in headers {
                request = request.header(key, value);
            }
            match &self.credentials {
                Credentials::None => request,
                Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
                Credentials::Bearer(token) => request.bearer_auth(token),
            }
        }
    }

    fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
        map.iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect()
    }

    impl HttpClient for ReqwestClient {
        async fn send(
            &self,
            method: Method,
            url: &str,
            headers: &[(String, String)],
            body: Body,
        ) -> Result<Response> {
            let mut request = self.request(method, url, headers);
            request = match body {
                Body::Empty => request,
                Body::Bytes(bytes) => request.body(bytes),
                Body::File(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .map_err(|e| Error::io(&path, e))?;
                    let len = file.metadata().await.map_err(|e| Error::io(&path, e))?.len();
                    request
                        .header(reqwest::header::CONTENT_LENGTH, len)
                        .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
                }
            };

            let response = request.send().await.map_err(|e| Error::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body = response.bytes().await.map_err(|e| Error::Network(e.to_string()))?;
            tracing::trace!(method = method.as_str(), url, status, "request completed");
            Ok(Response {
                status,
                headers,
                body,
            })
        }

        async fn stream(&self, url: &str, headers: &[(String, String)]) -> Result<StreamResponse> {
            let response = self
                .request(Method::Get, url, headers)
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| Error::Network(e.to_string())));
            Ok(StreamResponse {
                status,
                headers,
                body: Box::pin(body),
            })
        }
    }
}
