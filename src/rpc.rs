//! Ordered endpoint fallback for read calls
//!
//! Every read goes through `Endpoints::try_each`: endpoints are attempted
//! in order with a bounded per-attempt timeout, and only when all of them
//! fail does the caller see `NetworkUnavailable`. Writes never use this
//! combinator; they go to the primary endpoint only and are not retried.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, SafeFlowError};

/// Parse a comma-separated RPC URL string into individual trimmed URLs.
pub fn parse_rpc_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// An ordered list of equivalent endpoints with a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct Endpoints {
    urls: Vec<String>,
    attempt_timeout: Duration,
}

impl Endpoints {
    pub fn new(urls: Vec<String>, attempt_timeout: Duration) -> Result<Self> {
        if urls.is_empty() {
            return Err(SafeFlowError::NetworkUnavailable(
                "at least one endpoint URL is required".to_string(),
            ));
        }
        Ok(Self {
            urls,
            attempt_timeout,
        })
    }

    /// The primary endpoint, used for writes.
    pub fn primary(&self) -> &str {
        &self.urls[0]
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Run `op` against each endpoint in order until one succeeds.
    ///
    /// Each attempt is bounded by the configured timeout; a timed-out or
    /// failed attempt falls through to the next URL. When every endpoint
    /// fails, returns `NetworkUnavailable` carrying the last error.
    pub async fn try_each<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::from("no endpoints attempted");

        for url in &self.urls {
            match tokio::time::timeout(self.attempt_timeout, op(url.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "Endpoint attempt failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!(url = %url, timeout = ?self.attempt_timeout, "Endpoint attempt timed out");
                    last_error = format!("timed out after {:?}", self.attempt_timeout);
                }
            }
            debug!(url = %url, "Falling through to next endpoint");
        }

        Err(SafeFlowError::NetworkUnavailable(format!(
            "all {} endpoints failed, last error: {}",
            self.urls.len(),
            last_error
        )))
    }
}
