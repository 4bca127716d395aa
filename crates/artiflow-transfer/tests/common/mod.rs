#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use artiflow_fetch::{Body, HttpClient, Method, Response, StreamResponse, find_header};
use bytes::Bytes;

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// A request as the server saw it.
#[derive(Clone, Debug)]
pub struct Request {
    pub method:   Method,
    pub url:      String,
    pub headers:  Vec<(String, String)>,
    pub body_len: u64,
    pub body:     String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> { find_header(&self.headers, name) }

    pub fn is_checksum_deploy(&self) -> bool { self.header("X-Checksum-Deploy") == Some("true") }
}

/// Requests of one or more servers, in arrival order.
pub type Journal = Arc<Mutex<Vec<Request>>>;

struct Route {
    method:          Method,
    marker:          String,
    checksum_deploy: Option<bool>,
    status:          u16,
    body:            String,
}

/// In-memory repository server. Requests are answered by the first route
/// whose method matches and whose marker occurs in the URL or body; GETs of
/// registered files are streamed. Anything else gets a 404.
#[derive(Default)]
pub struct RepoServer {
    routes:  Vec<Route>,
    files:   HashMap<String, Vec<u8>>,
    journal: Journal,
}

impl RepoServer {
    pub fn new() -> Self { Self::default() }

    pub fn route(mut self, method: Method, marker: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            marker: marker.to_string(),
            checksum_deploy: Some(false).filter(|_| method == Method::Put),
            status,
            body: body.to_string(),
        });
        self
    }

    /// Status of every checksum-deploy PUT.
    pub fn checksum_deploy(mut self, status: u16) -> Self {
        self.routes.insert(0, Route {
            method: Method::Put,
            marker: String::new(),
            checksum_deploy: Some(true),
            status,
            body: String::new(),
        });
        self
    }

    pub fn file(mut self, url: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), data.into());
        self
    }

    pub fn journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn requests(&self) -> Vec<Request> { self.journal.lock().unwrap().clone() }

    pub fn sent(&self, method: Method) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.method == method).collect()
    }

    fn record(&self, request: Request) { self.journal.lock().unwrap().push(request); }
}

fn body_of(body: Body) -> (u64, String) {
    match body {
        Body::Empty => (0, String::new()),
        Body::Bytes(bytes) => (bytes.len() as u64, String::from_utf8_lossy(&bytes).into_owned()),
        Body::File(path) => {
            let data = std::fs::read(path).unwrap_or_default();
            (data.len() as u64, String::new())
        }
    }
}

impl HttpClient for RepoServer {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Body,
    ) -> artiflow_fetch::Result<Response> {
        let (body_len, text) = body_of(body);
        let request = Request {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
            body_len,
            body: text,
        };
        let (status, answer) = self
            .routes
            .iter()
            .find(|route| {
                route.method == method
                    && (url.contains(&route.marker) || request.body.contains(&route.marker))
                    && route.checksum_deploy.is_none_or(|deploy| deploy == request.is_checksum_deploy())
            })
            .map(|route| (route.status, route.body.clone()))
            .unwrap_or((404, String::new()));
        self.record(request);
        Ok(Response {
            status,
            headers: Vec::new(),
            body: Bytes::from(answer),
        })
    }

    async fn stream(&self, url: &str, headers: &[(String, String)]) -> artiflow_fetch::Result<StreamResponse> {
        self.record(Request {
            method:   Method::Get,
            url:      url.to_string(),
            headers:  headers.to_vec(),
            body_len: 0,
            body:     String::new(),
        });
        let (status, data) = match self.files.get(url) {
            Some(data) => (200, data.clone()),
            None => (404, b"not found".to_vec()),
        };
        let parts: Vec<artiflow_fetch::Result<Bytes>> = vec![Ok(Bytes::from(data))];
        Ok(StreamResponse {
            status,
            headers: Vec::new(),
            body: Box::pin(futures_util::stream::iter(parts)),
        })
    }
}

/// One entry of a search response.
pub fn item(repo: &str, path: &str, name: &str, kind: &str) -> serde_json::Value {
    serde_json::json!({ "repo": repo, "path": path, "name": name, "type": kind })
}

pub fn results(items: Vec<serde_json::Value>) -> String { serde_json::json!({ "results": items }).to_string() }
