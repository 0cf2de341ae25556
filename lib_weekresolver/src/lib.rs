//! # Week Resolver Connector
//!
//! Client library for the week resolver service. Given a catalogue code and a
//! date, the service answers with the week code used to tag a bibliographic
//! record with its publication cycle.
//!
//! ## Contained Modules:
//!
//! - **`request`**: pure construction of the `api/v1/date/{code}/{date}` route.
//! - **`models`**: the `ResolutionResult` record returned by the service.
//! - **`retrieve`**: the retry policy, the retrying HTTP client and the
//!   `WeekResolverConnector` that ties them together.
//! - **`configs`** (feature `configs`): connector settings from the environment.
//! - **`loggers`** (feature `loggers`): `tracing` subscriber setup for binaries.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Typed failures of the connector.
pub mod error;
/// Data returned by the week resolver service.
pub mod models;
/// Request path construction and input validation.
pub mod request;
/// Retry policy and the resilient connector.
pub mod retrieve;

/// Environment-driven connector configuration.
#[cfg(feature = "configs")]
pub mod configs;
/// Subscriber setup for binaries using this crate.
#[cfg(feature = "loggers")]
pub mod loggers;

pub use error::{ConnectorError, FailureCause};
pub use models::resolution::{AnchorDate, ResolutionResult};
pub use request::params::{build_path, RequestBuilder, ResolutionRequest};
pub use retrieve::connector::WeekResolverConnector;
pub use retrieve::ky_http::Timeouts;
pub use retrieve::retry_policy::{Outcome, RetryPolicy};

#[cfg(feature = "configs")]
pub use configs::config_env::{ConfigError, ConnectorConfig};
