//! # Retry Policy
//!
//! The policy is plain data: which status codes are transient, whether
//! transport failures are, how long to wait and how many retries to allow.
//! The decision itself (`is_retryable`) only sees an `Outcome`, so it can be
//! exercised without any HTTP machinery.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, Retryable, RetryableStrategy};

/// Status codes the service is known to answer with while starting up or
/// redeploying.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 3] = [404, 500, 502];
/// Delay between two attempts.
pub const DEFAULT_FIXED_DELAY: Duration = Duration::from_secs(5);
/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What one physical attempt ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The exchange completed with this status code.
    Status(u16),
    /// The exchange failed before a response was received (DNS, refused,
    /// reset, timeout).
    TransportFailure,
}

/// Immutable retry configuration shared by every call of a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retryable_status_codes: BTreeSet<u16>,
    retry_on_transport_failure: bool,
    fixed_delay: Duration,
    max_retries: u32,
}

impl Default for RetryPolicy {
    /// 404/500/502 and transport failures, 5 s apart, 3 retries.
    fn default() -> Self {
        Self {
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            retry_on_transport_failure: true,
            fixed_delay: DEFAULT_FIXED_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from its four settings.
    pub fn new(
        retryable_status_codes: impl IntoIterator<Item = u16>,
        retry_on_transport_failure: bool,
        fixed_delay: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            retryable_status_codes: retryable_status_codes.into_iter().collect(),
            retry_on_transport_failure,
            fixed_delay,
            max_retries,
        }
    }

    /// Copy of this policy with another delay.
    pub fn with_fixed_delay(mut self, fixed_delay: Duration) -> Self {
        self.fixed_delay = fixed_delay;
        self
    }

    /// Copy of this policy with another retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Copy of this policy with another set of transient status codes.
    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Copy of this policy with transport retries switched on or off.
    pub fn with_retry_on_transport_failure(mut self, retry: bool) -> Self {
        self.retry_on_transport_failure = retry;
        self
    }

    /// Status codes treated as transient.
    pub fn retryable_status_codes(&self) -> &BTreeSet<u16> {
        &self.retryable_status_codes
    }

    /// Whether transport failures are retried.
    pub fn retry_on_transport_failure(&self) -> bool {
        self.retry_on_transport_failure
    }

    /// Wait between attempts.
    pub fn fixed_delay(&self) -> Duration {
        self.fixed_delay
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Physical attempts a single call may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Upper bound of time spent sleeping within one call.
    pub fn worst_case_delay(&self) -> Duration {
        self.fixed_delay.saturating_mul(self.max_retries)
    }

    /// Whether `outcome` should trigger another attempt.
    pub fn is_retryable(&self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Status(code) => self.retryable_status_codes.contains(code),
            Outcome::TransportFailure => self.retry_on_transport_failure,
        }
    }

    /// Backoff schedule for `reqwest-retry`: bounds pinned to the fixed delay,
    /// base 1 and no jitter, so every wait is exactly `fixed_delay`.
    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.fixed_delay, self.fixed_delay)
            .base(1)
            .jitter(Jitter::None)
            .build_with_max_retries(self.max_retries)
    }
}

/// Whether a `reqwest` error happened while establishing or completing the
/// exchange, as opposed to building the request or decoding the body.
pub fn is_connectivity_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// Finds the underlying `reqwest::Error`, looking through the wrappers added
/// by the middleware stack.
pub fn find_reqwest_error(err: &reqwest_middleware::Error) -> Option<&reqwest::Error> {
    match err {
        reqwest_middleware::Error::Reqwest(e) => Some(e),
        reqwest_middleware::Error::Middleware(inner) => inner.chain().find_map(|cause| {
            cause.downcast_ref::<reqwest::Error>().or_else(|| {
                match cause.downcast_ref::<reqwest_middleware::Error>() {
                    Some(reqwest_middleware::Error::Reqwest(e)) => Some(e),
                    _ => None,
                }
            })
        }),
    }
}

/// Classifies a middleware result into an `Outcome`.
///
/// Returns `None` for errors that are not connectivity failures; those are
/// never retried.
pub fn classify(result: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Outcome> {
    match result {
        Ok(response) => Some(Outcome::Status(response.status().as_u16())),
        Err(err) => find_reqwest_error(err)
            .filter(|e| is_connectivity_failure(e))
            .map(|_| Outcome::TransportFailure),
    }
}

/// Adapter feeding `RetryPolicy::is_retryable` into `reqwest-retry`.
#[derive(Debug, Clone)]
pub struct PolicyStrategy {
    policy: Arc<RetryPolicy>,
}

impl PolicyStrategy {
    /// Wraps a shared policy.
    pub fn new(policy: Arc<RetryPolicy>) -> Self {
        Self { policy }
    }
}

impl RetryableStrategy for PolicyStrategy {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match classify(res) {
            Some(outcome) if self.policy.is_retryable(&outcome) => Some(Retryable::Transient),
            Some(_) if res.is_ok() => None,
            _ => Some(Retryable::Fatal),
        }
    }
}
