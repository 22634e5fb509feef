//! Error taxonomy for the telemetry client
//!
//! Every fallible operation returns [`TelemetryError`]. Nothing in this crate
//! logs an error and swallows it; diagnostics emitted through `tracing` are a
//! side channel only.

use std::fmt;
use thiserror::Error;

/// Errors returned by the telemetry client
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A span operation was attempted without a trace pipeline
    #[error("tracer not initialized")]
    NotInitialized,

    /// The trace export pipeline (or its configuration) could not be built
    #[error("Failed to initialize trace pipeline: {0}")]
    Config(String),

    /// Invalid log level, empty message or empty span name
    #[error("{0}")]
    Validation(String),

    /// Cancellation or deadline fired while waiting for a rate-limit token
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Log delivery failed at the network level or with a non-success status
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// One or more failures while flushing or closing the export pipeline
    #[error("shutdown errors: {}", .0.join("; "))]
    Shutdown(Vec<String>),
}

impl TelemetryError {
    /// The HTTP response attached to a delivery failure, if one was received
    pub fn response(&self) -> Option<&reqwest::Response> {
        match self {
            TelemetryError::Transport(err) => err.response(),
            _ => None,
        }
    }

    /// Take ownership of the HTTP response attached to a delivery failure
    pub fn into_response(self) -> Option<reqwest::Response> {
        match self {
            TelemetryError::Transport(err) => err.response,
            _ => None,
        }
    }
}

impl From<crate::config::ConfigError> for TelemetryError {
    fn from(err: crate::config::ConfigError) -> Self {
        TelemetryError::Config(err.to_string())
    }
}

/// Failure delivering a log record to the log endpoint
///
/// Connection errors and timeouts carry no response. A received response with
/// status >= 300 is kept so callers can inspect it.
#[derive(Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<reqwest::Error>,
    response: Option<reqwest::Response>,
}

impl TransportError {
    /// Connection failure, timeout or cancellation before any response arrived
    pub(crate) fn request(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Self {
            message: message.into(),
            source,
            response: None,
        }
    }

    /// The endpoint answered with a non-success status
    pub(crate) fn status(response: reqwest::Response) -> Self {
        Self {
            message: format!(
                "failed to send log record, status code: {}",
                response.status().as_u16()
            ),
            source: None,
            response: Some(response),
        }
    }

    /// The received response, absent for network-level failures
    pub fn response(&self) -> Option<&reqwest::Response> {
        self.response.as_ref()
    }

    /// Whether the request timed out
    pub fn is_timeout(&self) -> bool {
        self.source.as_ref().is_some_and(reqwest::Error::is_timeout)
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportError")
            .field("message", &self.message)
            .field("source", &self.source)
            .field("status", &self.response.as_ref().map(|r| r.status()))
            .finish()
    }
}
