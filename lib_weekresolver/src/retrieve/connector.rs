//! # Week Resolver Connector
//!
//! The public client of the week resolver service.
//!
//! ## Logic:
//! 1.  The catalogue code and date are validated and turned into
//!     `api/v1/date/{code}/{date}`. Bad input fails here, before any I/O.
//! 2.  A GET is issued through `ApiClient`, whose middleware retries
//!     transport failures and the retryable status codes of the policy with a
//!     fixed delay, up to `max_retries` times.
//! 3.  The final outcome is mapped:
//!     - a retryable status or transport failure means the budget ran out and
//!       becomes `ServiceUnavailable`,
//!     - any other status than 200 becomes `UnexpectedStatus`,
//!     - a 200 whose body cannot be read as a result becomes `EmptyResponse`.
//!
//! A connector may be shared between tasks (`Arc<WeekResolverConnector>`).
//! Concurrent calls are independent; nothing is deduplicated.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::{ConnectorError, FailureCause};
use crate::models::resolution::ResolutionResult;
use crate::request::params::ResolutionRequest;
use crate::retrieve::ky_http::{ApiClient, Timeouts};
use crate::retrieve::retry_policy::{find_reqwest_error, is_connectivity_failure, Outcome, RetryPolicy};

#[cfg(feature = "configs")]
use crate::configs::config_env::{ConfigError, ConnectorConfig};

/// Week resolver client.
///
/// Owns one HTTP transport for its whole lifetime. `close` releases it;
/// afterwards every call fails with `ClientClosed`.
#[derive(Debug)]
pub struct WeekResolverConnector {
    /// `None` once the connector has been closed.
    client: RwLock<Option<ApiClient>>,
    /// Kept outside the lock so it stays readable after `close`.
    base_url: String,
    /// Deadline applied by `resolve` and `resolve_today`.
    call_deadline: Option<Duration>,
}

impl WeekResolverConnector {
    /// Connector with the default retry policy and its own transport.
    pub fn new(base_url: &str) -> Result<Self, ConnectorError> {
        Self::with_policy(base_url, RetryPolicy::default())
    }

    /// Connector with a custom retry policy.
    pub fn with_policy(base_url: &str, policy: RetryPolicy) -> Result<Self, ConnectorError> {
        Self::with_options(base_url, policy, Timeouts::default())
    }

    /// Connector with a custom retry policy and transport timeouts.
    pub fn with_options(
        base_url: &str,
        policy: RetryPolicy,
        timeouts: Timeouts,
    ) -> Result<Self, ConnectorError> {
        info!("Creating WeekResolverConnector for: {}", base_url);
        Ok(Self::from_api_client(ApiClient::new(
            base_url,
            policy.into(),
            timeouts,
        )?))
    }

    /// Connector around a caller-supplied `reqwest::Client`.
    ///
    /// The client must be safe for concurrent use if the connector is shared,
    /// which holds for `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Result<Self, ConnectorError> {
        info!("Creating WeekResolverConnector for: {}", base_url);
        Ok(Self::from_api_client(ApiClient::with_client(
            client,
            base_url,
            policy.into(),
        )?))
    }

    /// Connector built from a loaded configuration.
    #[cfg(feature = "configs")]
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let connector = Self::with_options(
            &config.service_url,
            config.retry.clone(),
            Timeouts {
                connect: config.connect_timeout,
                request: config.request_timeout,
            },
        )?;
        Ok(match config.call_deadline {
            Some(deadline) => connector.with_call_deadline(deadline),
            None => connector,
        })
    }

    /// Connector configured from `WEEKRESOLVER_SERVICE_URL` and friends.
    #[cfg(feature = "configs")]
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ConnectorConfig::from_env()?;
        Ok(Self::from_config(&config)?)
    }

    fn from_api_client(client: ApiClient) -> Self {
        Self {
            base_url: client.base_url().to_string(),
            client: RwLock::new(Some(client)),
            call_deadline: None,
        }
    }

    /// Sets the deadline used by `resolve` and `resolve_today`.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = Some(deadline);
        self
    }

    /// Base URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Deadline applied to calls without an explicit one.
    pub fn call_deadline(&self) -> Option<Duration> {
        self.call_deadline
    }

    /// Resolves the week code of `catalogue_code` for today's local date.
    pub async fn resolve_today(&self, catalogue_code: &str) -> Result<ResolutionResult, ConnectorError> {
        self.resolve(catalogue_code, Local::now().date_naive()).await
    }

    /// Resolves the week code of `catalogue_code` for `date`.
    pub async fn resolve(
        &self,
        catalogue_code: &str,
        date: NaiveDate,
    ) -> Result<ResolutionResult, ConnectorError> {
        let request = ResolutionRequest::new(catalogue_code, date)?;
        self.run(&request, self.call_deadline).await
    }

    /// Like `resolve`, but gives up with `DeadlineExceeded` once `deadline`
    /// has passed, including time spent waiting between attempts.
    pub async fn resolve_with_deadline(
        &self,
        catalogue_code: &str,
        date: NaiveDate,
        deadline: Duration,
    ) -> Result<ResolutionResult, ConnectorError> {
        let request = ResolutionRequest::new(catalogue_code, date)?;
        self.run(&request, Some(deadline)).await
    }

    /// Resolves an already validated request.
    pub async fn resolve_request(
        &self,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult, ConnectorError> {
        self.run(request, self.call_deadline).await
    }

    /// Releases the transport. Safe to call any number of times.
    ///
    /// Calls already in flight keep their handle until they finish.
    pub fn close(&self) {
        let mut guard = self.client.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            info!("Closed WeekResolverConnector for: {}", self.base_url);
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn api_client(&self) -> Result<ApiClient, ConnectorError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ConnectorError::ClientClosed)
    }

    async fn run(
        &self,
        request: &ResolutionRequest,
        deadline: Option<Duration>,
    ) -> Result<ResolutionResult, ConnectorError> {
        let api = self.api_client()?;
        let started = Instant::now();

        let result = match deadline {
            Some(limit) => tokio::time::timeout(limit, execute(&api, request))
                .await
                .unwrap_or_else(|_| Err(ConnectorError::DeadlineExceeded(limit))),
            None => execute(&api, request).await,
        };

        info!(
            catalogue_code = request.catalogue_code(),
            date = %request.date(),
            "resolve took {} ms",
            started.elapsed().as_millis()
        );
        if let Err(err) = &result {
            warn!(catalogue_code = request.catalogue_code(), "week code lookup failed: {}", err);
        }
        result
    }
}

async fn execute(api: &ApiClient, request: &ResolutionRequest) -> Result<ResolutionResult, ConnectorError> {
    let policy = api.policy();
    let url = api.url_for(&request.path())?;
    debug!(%url, "requesting week code");

    let response = match api.get(url).await {
        Ok(response) => response,
        Err(err) => return Err(transport_failure(policy, err)),
    };

    let status = response.status();
    if policy.is_retryable(&Outcome::Status(status.as_u16())) {
        return Err(ConnectorError::ServiceUnavailable {
            attempts: policy.max_attempts(),
            cause: FailureCause::Status(status.as_u16()),
        });
    }
    if status != StatusCode::OK {
        return Err(ConnectorError::unexpected_status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ConnectorError::Transport(reqwest_middleware::Error::Reqwest(e)))?;
    ResolutionResult::from_body(&body)
}

/// A connectivity failure covered by the policy has already been retried by
/// the middleware; anything else passes through as `Transport`.
fn transport_failure(policy: &RetryPolicy, err: reqwest_middleware::Error) -> ConnectorError {
    let connectivity = find_reqwest_error(&err).is_some_and(is_connectivity_failure);
    if connectivity && policy.is_retryable(&Outcome::TransportFailure) {
        ConnectorError::ServiceUnavailable {
            attempts: policy.max_attempts(),
            cause: FailureCause::Transport(err),
        }
    } else {
        ConnectorError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Nothing listens on port 9 locally; these tests must fail before I/O anyway.
    fn connector() -> WeekResolverConnector {
        WeekResolverConnector::with_policy(
            "http://127.0.0.1:9",
            RetryPolicy::default().with_fixed_delay(Duration::from_secs(60)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_code_fails_without_waiting_for_retries() {
        let started = Instant::now();
        let err = connector().resolve("", date(2019, 10, 10)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn closed_connector_rejects_calls() {
        let connector = connector();
        assert!(!connector.is_closed());
        connector.close();
        connector.close();
        assert!(connector.is_closed());
        let err = connector.resolve("DPF", date(2019, 10, 10)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ClientClosed));
        let err = connector.resolve_today("DPF").await.unwrap_err();
        assert!(matches!(err, ConnectorError::ClientClosed));
    }

    #[test]
    fn close_without_calls_is_safe() {
        let connector = connector();
        connector.close();
        assert!(connector.is_closed());
        assert_eq!(connector.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = WeekResolverConnector::new("").unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    }

    #[test]
    fn call_deadline_is_recorded() {
        let connector = connector().with_call_deadline(Duration::from_secs(2));
        assert_eq!(connector.call_deadline(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn connector_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WeekResolverConnector>();
    }
}
