//! # Connector Errors
//!
//! Every failure a caller can observe from the connector is one variant of
//! `ConnectorError`. Nothing is retried outside the retry policy, and nothing
//! is replaced by a default result.

use std::time::Duration;

use thiserror::Error;

/// The last thing observed before the retry budget ran out.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// The final attempt answered with a retryable status code.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The final attempt failed at the transport level.
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest_middleware::Error),
}

/// Custom error types for week resolver calls.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Missing or malformed caller input. Raised before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every allowed attempt ended in a retryable outcome.
    #[error("Weekresolver service unavailable after {attempts} attempts: {cause}")]
    ServiceUnavailable {
        /// Number of physical attempts made.
        attempts: u32,
        /// Last status or transport error seen.
        cause: FailureCause,
    },

    /// A status that is neither 200 nor retryable.
    #[error("{message}")]
    UnexpectedStatus {
        /// The HTTP status code returned by the service.
        code: u16,
        /// Human readable description.
        message: String,
    },

    /// Status 200 with a body that cannot be mapped to a result.
    #[error("Weekresolver service returned an unusable entity: {0}")]
    EmptyResponse(String),

    /// The connector was closed before the call.
    #[error("connector has been closed")]
    ClientClosed,

    /// The caller's deadline elapsed before the call completed.
    #[error("call did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    /// A transport failure that the retry policy does not cover.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest_middleware::Error),
}

impl ConnectorError {
    /// Builds the `UnexpectedStatus` variant with the standard message.
    pub fn unexpected_status(code: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown");
        ConnectorError::UnexpectedStatus {
            code,
            message: format!(
                "Weekresolver service returned with unexpected status code: {} {}",
                code, reason
            ),
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ConnectorError::UnexpectedStatus { code, .. } => Some(*code),
            ConnectorError::ServiceUnavailable {
                cause: FailureCause::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_message_names_code_and_reason() {
        let err = ConnectorError::unexpected_status(403);
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(
            err.to_string(),
            "Weekresolver service returned with unexpected status code: 403 Forbidden"
        );
    }

    #[test]
    fn service_unavailable_exposes_last_status() {
        let err = ConnectorError::ServiceUnavailable {
            attempts: 4,
            cause: FailureCause::Status(502),
        };
        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("after 4 attempts"));
    }

    #[test]
    fn closed_has_no_status() {
        assert_eq!(ConnectorError::ClientClosed.status_code(), None);
    }
}
