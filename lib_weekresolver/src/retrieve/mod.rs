//! # Data Retrieval Module
//!
//! Everything that talks to the week resolver service over HTTP.
//!
//! ## Contained Modules:
//!
//! - **`retry_policy`**: the immutable retry configuration and the pure
//!   `is_retryable` decision, plus its adapter for `reqwest-retry`.
//! - **`ky_http`**: a GET-only `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, retrying with a fixed delay.
//! - **`connector`**: `WeekResolverConnector`, the public entry point that
//!   validates input, executes the lookup and maps outcomes to errors.

/// Retry configuration and retry decisions.
pub mod retry_policy;

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;

/// The week resolver connector.
pub mod connector;
