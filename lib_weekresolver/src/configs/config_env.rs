use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::ConnectorError;
use crate::retrieve::retry_policy::RetryPolicy;

/// Base URL of the week resolver service.
pub const SERVICE_URL_VAR: &str = "WEEKRESOLVER_SERVICE_URL";
/// Milliseconds between two attempts.
pub const RETRY_DELAY_MS_VAR: &str = "WEEKRESOLVER_RETRY_DELAY_MS";
/// Retries after the first attempt.
pub const MAX_RETRIES_VAR: &str = "WEEKRESOLVER_MAX_RETRIES";
/// Comma separated status codes to retry on.
pub const RETRYABLE_STATUS_CODES_VAR: &str = "WEEKRESOLVER_RETRYABLE_STATUS_CODES";
/// Connect timeout in milliseconds.
pub const CONNECT_TIMEOUT_MS_VAR: &str = "WEEKRESOLVER_CONNECT_TIMEOUT_MS";
/// Per-attempt request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS_VAR: &str = "WEEKRESOLVER_REQUEST_TIMEOUT_MS";
/// Overall per-call deadline in milliseconds.
pub const CALL_DEADLINE_MS_VAR: &str = "WEEKRESOLVER_CALL_DEADLINE_MS";

/// Errors raised while loading the connector configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Environment variable {0} is not present")]
    MissingEnvVar(String),

    /// A variable is set but cannot be parsed.
    #[error("Environment variable {name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration parsed but the connector rejected it.
    #[error("Failed to create connector: {0}")]
    Connector(#[from] ConnectorError),
}

/// Everything needed to construct a `WeekResolverConnector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Root endpoint of the week resolver service.
    pub service_url: String,
    /// Retry policy shared by every call.
    pub retry: RetryPolicy,
    /// Limit for establishing a connection.
    pub connect_timeout: Option<Duration>,
    /// Limit for one exchange, per attempt.
    pub request_timeout: Option<Duration>,
    /// Limit for a whole call including retries.
    pub call_deadline: Option<Duration>,
}

impl ConnectorConfig {
    /// Configuration with defaults for everything but the URL.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            retry: RetryPolicy::default(),
            connect_timeout: None,
            request_timeout: None,
            call_deadline: None,
        }
    }

    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case in deployed containers.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_url = lookup(SERVICE_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(SERVICE_URL_VAR.to_string()))?;

        let mut retry = RetryPolicy::default();
        if let Some(delay) = parse_var::<u64, _>(&lookup, RETRY_DELAY_MS_VAR)? {
            retry = retry.with_fixed_delay(Duration::from_millis(delay));
        }
        if let Some(max_retries) = parse_var::<u32, _>(&lookup, MAX_RETRIES_VAR)? {
            retry = retry.with_max_retries(max_retries);
        }
        if let Some(raw) = lookup(RETRYABLE_STATUS_CODES_VAR) {
            retry = retry.with_retryable_status_codes(parse_status_codes(&raw)?);
        }

        Ok(Self {
            service_url,
            retry,
            connect_timeout: parse_var::<u64, _>(&lookup, CONNECT_TIMEOUT_MS_VAR)?
                .map(Duration::from_millis),
            request_timeout: parse_var::<u64, _>(&lookup, REQUEST_TIMEOUT_MS_VAR)?
                .map(Duration::from_millis),
            call_deadline: parse_var::<u64, _>(&lookup, CALL_DEADLINE_MS_VAR)?
                .map(Duration::from_millis),
        })
    }
}

impl fmt::Display for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectorConfig
    Service URL: {},
    Retryable status codes: {:?},
    Retry on transport failure: {},
    Fixed delay: {:?},
    Max retries: {},
    Connect timeout: {:?},
    Request timeout: {:?},
    Call deadline: {:?}
",
            self.service_url,
            self.retry.retryable_status_codes(),
            self.retry.retry_on_transport_failure(),
            self.retry.fixed_delay(),
            self.retry.max_retries(),
            self.connect_timeout,
            self.request_timeout,
            self.call_deadline
        )
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_status_codes(raw: &str) -> Result<Vec<u16>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => Ok(code),
            Ok(code) => Err(format!("{} is not an HTTP status code", code)),
            Err(e) => Err(e.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| ConfigError::InvalidValue {
            name: RETRYABLE_STATUS_CODES_VAR.to_string(),
            value: raw.to_string(),
            reason,
        })
}
