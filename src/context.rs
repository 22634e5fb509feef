//! Per-call context
//!
//! [`CallContext`] carries everything an operation needs from its caller:
//! the OpenTelemetry context holding the parent span, the request-correlation
//! id stamped on log records, and the cancellation token and deadline that
//! bound rate-limit waits and log delivery.
//!
//! # Example
//!
//! ```
//! use alloy_telemetry::context::CallContext;
//! use std::time::Duration;
//!
//! let cx = CallContext::new()
//!     .with_request_id("abc-123")
//!     .with_timeout(Duration::from_secs(2));
//! assert_eq!(cx.request_id(), Some("abc-123"));
//! ```

use opentelemetry::Context;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Request-correlation id stored in an OpenTelemetry [`Context`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Caller-supplied context for a single client operation
#[derive(Debug, Clone)]
pub struct CallContext {
    otel: Context,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Empty context: no parent span, no request id, never cancelled
    pub fn new() -> Self {
        Self {
            otel: Context::new(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Wrap an existing OpenTelemetry context (e.g. one extracted from headers)
    pub fn from_otel(otel: Context) -> Self {
        Self {
            otel,
            ..Self::new()
        }
    }

    /// Attach a request-correlation id
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.otel = self.otel.with_value(RequestId(id.into()));
        self
    }

    /// Use `token` for cancellation instead of the context's own token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Replace the OpenTelemetry context, keeping cancellation and deadline
    pub(crate) fn with_otel(&self, otel: Context) -> Self {
        Self {
            otel,
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    /// The OpenTelemetry context (parent span and values)
    pub fn otel(&self) -> &Context {
        &self.otel
    }

    /// The request-correlation id, if one was attached
    pub fn request_id(&self) -> Option<&str> {
        self.otel.get::<RequestId>().map(|id| id.0.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone sharing its token
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context was cancelled or its deadline has passed
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }

    /// Human readable reason for [`is_done`](Self::is_done)
    pub(crate) fn done_reason(&self) -> &'static str {
        if self.cancel.is_cancelled() {
            "context canceled"
        } else {
            "context deadline exceeded"
        }
    }
}
