use std::time::Duration;

use crate::error::Result;
use crate::http::{Body, HttpClient, Method, Response, StreamResponse};

/// Delay before retry `retry_count` (0-indexed): `base * 2^retry_count`.
///
/// ```
/// use std::time::Duration;
/// use artiflow_fetch::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Wraps a client and replays requests that failed in transport or got a 5xx.
#[derive(Clone, Debug)]
pub struct RetryingClient<C> {
    inner:       C,
    max_retries: u32,
    backoff:     Duration,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }

    pub fn inner(&self) -> &C { &self.inner }

    async fn pause(&self, attempt: u32, url: &str, reason: &str) {
        let delay = retry_delay(attempt, self.backoff);
        tracing::warn!(
            url,
            attempt = attempt + 1,
            max = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            "{reason}, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

impl<C: HttpClient> HttpClient for RetryingClient<C> {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Body,
    ) -> Result<Response> {
        let mut attempt = 0;
        loop {
            match self.inner.send(method, url, headers, body.clone()).await {
                Ok(response) if response.status >= 500 && attempt < self.max_retries => {
                    self.pause(attempt, url, &format!("server responded {}", response.status))
                        .await;
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    self.pause(attempt, url, &e.to_string()).await;
                }
                result => return result,
            }
            attempt += 1;
        }
    }

    async fn stream(&self, url: &str, headers: &[(String, String)]) -> Result<StreamResponse> {
        let mut attempt = 0;
        loop {
            match self.inner.stream(url, headers).await {
                Ok(response) if response.status >= 500 && attempt < self.max_retries => {
                    self.pause(attempt, url, &format!("server responded {}", response.status))
                        .await;
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    self.pause(attempt, url, &e.to_string()).await;
                }
                result => return result,
            }
            attempt += 1;
        }
    }
}
