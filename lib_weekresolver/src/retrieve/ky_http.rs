//! # HTTP Retrieval Utilities
//!
//! A thin asynchronous API client wrapper around `reqwest`. Retries are done
//! by `reqwest-retry` middleware driven by a `RetryPolicy`, so one `get`
//! call may make several physical attempts with a fixed pause between them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;

use crate::error::ConnectorError;
use crate::retrieve::retry_policy::{PolicyStrategy, RetryPolicy};

/// Transport timeouts applied to the underlying `reqwest::Client`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Limit for establishing a connection.
    pub connect: Option<Duration>,
    /// Limit for one complete exchange, per attempt.
    pub request: Option<Duration>,
}

/// A retrying GET client bound to one base URL.
///
/// Cloning is cheap and clones share the same connection pool.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// Base URL without trailing slash; paths are appended after a `/`.
    base_url: String,
    /// Policy the middleware was built with.
    policy: Arc<RetryPolicy>,
}

impl ApiClient {
    /// Creates a client with its own connection pool.
    pub fn new(
        base_url: &str,
        policy: Arc<RetryPolicy>,
        timeouts: Timeouts,
    ) -> Result<Self, ConnectorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(connect) = timeouts.connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(request) = timeouts.request {
            builder = builder.timeout(request);
        }
        let client = builder.build().map_err(|e| {
            ConnectorError::InvalidArgument(format!("failed to build HTTP client: {}", e))
        })?;
        Self::with_client(client, base_url, policy)
    }

    /// Wraps a caller-supplied `reqwest::Client` with the retry middleware.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        policy: Arc<RetryPolicy>,
    ) -> Result<Self, ConnectorError> {
        let base_url = normalize_base_url(base_url)?;

        let retry = RetryTransientMiddleware::new_with_policy_and_strategy(
            policy.backoff(),
            PolicyStrategy::new(Arc::clone(&policy)),
        );
        let inner = ClientBuilder::new(client).with(retry).build();

        Ok(Self {
            inner,
            base_url,
            policy,
        })
    }

    /// Base URL all paths are appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Policy applied to every request.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Absolute URL for a relative `path`: `base_url + "/" + path`.
    pub fn url_for(&self, path: &str) -> Result<Url, ConnectorError> {
        let full = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&full)
            .map_err(|e| ConnectorError::InvalidArgument(format!("invalid URL {}: {}", full, e)))
    }

    /// Performs a GET under the retry policy.
    ///
    /// Returns the response of the last attempt, whatever its status, or the
    /// last transport error.
    pub async fn get(&self, url: Url) -> Result<reqwest::Response, reqwest_middleware::Error> {
        self.inner
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Checks that `base_url` is a non-empty absolute URL and strips trailing
/// slashes.
fn normalize_base_url(base_url: &str) -> Result<String, ConnectorError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConnectorError::InvalidArgument("baseUrl must not be empty".into()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| ConnectorError::InvalidArgument(format!("invalid baseUrl {}: {}", trimmed, e)))?;
    if parsed.cannot_be_a_base() {
        return Err(ConnectorError::InvalidArgument(format!(
            "baseUrl {} cannot carry a path",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}
