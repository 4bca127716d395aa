//! HTTP plumbing for artifact repositories.
//!
//! - [`HttpClient`] is the transport seam; [`ReqwestClient`] is the production
//!   implementation and [`RetryingClient`] layers backoff on top of any client.
//! - [`Endpoint`] pairs a client with a server base URL and builds encoded
//!   request URLs.
//! - [`Fetcher`] downloads a file either as one stream or as parallel byte
//!   ranges, merged in order and checked against the expected sha1.

mod endpoint;
mod error;
mod fetcher;
mod http;
mod options;
mod retry;
mod segment;

pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use fetcher::{DownloadMode, DownloadRequest, Fetcher};
pub use http::{Body, BoxStream, Headers, HttpClient, Method, Response, StreamResponse, find_header};
#[cfg(feature = "reqwest")]
pub use http::{Credentials, ReqwestClient};
pub use options::{DEFAULT_MIN_SPLIT_SIZE, DEFAULT_SPLIT_COUNT, FetchOptions};
pub use retry::{RetryingClient, retry_delay};
pub use segment::{ChunkPlan, plan_chunks};
