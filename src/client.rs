//! Telemetry client facade
//!
//! [`TelemetryClient`] owns the tracer, the trace pipeline, the log rate
//! limiter and the log shipper. It is `Send + Sync`; share it behind an
//! `Arc` between tasks.
//!
//! # Example
//!
//! ```no_run
//! use alloy_telemetry::{CallContext, Level, TelemetryClient};
//! use opentelemetry::KeyValue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TelemetryClient::from_env()?;
//! let cx = CallContext::new().with_request_id("abc-123");
//!
//! let (cx, span) = client.start_trace(&cx, "handle-request")?;
//! client.add_span(&cx, "cache-lookup", vec![KeyValue::new("hit", true)])?;
//! client.add_log(&cx, Level::Info, "request handled", &[]).await?;
//! span.end();
//!
//! client.shutdown(&CallContext::new()).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::context::CallContext;
use crate::error::TelemetryError;
use crate::log::{IntoLevel, LogShipper};
use crate::ratelimit::RateLimiter;
use crate::trace::TracePipeline;
use opentelemetry::trace::{Span as _, SpanContext, Status, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::Tracer;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry point for spans, logs and shutdown
pub struct TelemetryClient {
    tracer: Option<Tracer>,
    rate_limiter: RateLimiter,
    shipper: LogShipper,
    config: Arc<Config>,
    // Taken exactly once by shutdown
    pipeline: Mutex<Option<TracePipeline>>,
}

impl fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("initialized", &self.tracer.is_some())
            .field("rate_limiter", &self.rate_limiter)
            .field("shipper", &self.shipper)
            .field("config", &self.config)
            .finish()
    }
}

impl TelemetryClient {
    /// Build the trace pipeline and the log shipper for `config`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Result<Self, TelemetryError> {
        let pipeline = TracePipeline::install(&config)?;
        Self::builder(config).pipeline(pipeline).build()
    }

    /// [`new`](Self::new) with configuration resolved from the environment
    pub fn from_env() -> Result<Self, TelemetryError> {
        Self::new(Config::from_env())
    }

    /// Assemble a client from parts
    ///
    /// A client built without a pipeline has no tracer: span operations
    /// return [`TelemetryError::NotInitialized`] while logging still works.
    pub fn builder(config: Config) -> TelemetryClientBuilder {
        TelemetryClientBuilder {
            config,
            pipeline: None,
            rate_limiter: None,
            http_client: None,
        }
    }

    /// The injected tracer, e.g. for [`init_subscriber`](crate::trace::init_subscriber)
    pub fn tracer(&self) -> Option<&Tracer> {
        self.tracer.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn require_tracer(&self) -> Result<&Tracer, TelemetryError> {
        self.tracer.as_ref().ok_or(TelemetryError::NotInitialized)
    }

    /// Start a span the caller ends
    ///
    /// The span is a child of any span carried by `cx`. The returned context
    /// carries the new span, so operations run with it nest underneath.
    pub fn start_trace(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<(CallContext, SpanHandle), TelemetryError> {
        let tracer = self.require_tracer()?;
        let span = tracer.start_with_context(name.to_string(), cx.otel());
        let otel = cx.otel().with_span(span);

        tracing::debug!(span_name = name, "Trace started");

        Ok((cx.with_otel(otel.clone()), SpanHandle { cx: otel }))
    }

    /// Record an instantaneous span with the given attributes
    pub fn add_span(
        &self,
        cx: &CallContext,
        name: &str,
        attributes: Vec<KeyValue>,
    ) -> Result<(), TelemetryError> {
        let tracer = self.require_tracer()?;
        let mut span = tracer.start_with_context(name.to_string(), cx.otel());
        span.set_attributes(attributes);
        span.end();
        Ok(())
    }

    /// Record an instantaneous span carrying a single `title = body` attribute
    pub fn add_titled_span(
        &self,
        cx: &CallContext,
        name: &str,
        title: &str,
        body: &str,
    ) -> Result<(), TelemetryError> {
        self.require_tracer()?;
        if name.is_empty() {
            return Err(TelemetryError::Validation(
                "span name cannot be empty".to_string(),
            ));
        }
        self.add_span(
            cx,
            name,
            vec![KeyValue::new(title.to_string(), body.to_string())],
        )
    }

    /// Ship one log record
    ///
    /// Validates level and message, waits for a rate-limit token, then POSTs
    /// the record. See [`LogShipper::send`] for how delivery failures are
    /// reported.
    pub async fn add_log<L: IntoLevel>(
        &self,
        cx: &CallContext,
        level: L,
        message: &str,
        attributes: &[KeyValue],
    ) -> Result<reqwest::Response, TelemetryError> {
        let level = LogShipper::validate(level, message)?;

        self.rate_limiter.wait(cx).await.map_err(|e| {
            tracing::warn!(
                error = %e,
                request_id = cx.request_id().unwrap_or(crate::log::UNKNOWN_REQUEST_ID),
                "Log record rejected by rate limiter"
            );
            e
        })?;

        let record = self.shipper.record(cx, level, message, attributes);
        self.shipper.send(cx, &record).await
    }

    /// Reconfigure the log rate limiter; non-positive values are ignored
    pub fn set_rate_limit(&self, rate: f64, burst: u32) {
        self.rate_limiter.set_rate_limit(rate, burst);
        tracing::debug!(
            rate = self.rate_limiter.rate(),
            burst = self.rate_limiter.burst(),
            "Rate limit updated"
        );
    }

    /// Current `(rate, burst)` of the log rate limiter
    pub fn rate_limit(&self) -> (f64, u32) {
        (self.rate_limiter.rate(), self.rate_limiter.burst())
    }

    /// Export queued spans now, keeping the pipeline running
    pub async fn flush(&self, cx: &CallContext) -> Result<(), TelemetryError> {
        match self.pipeline.lock().await.as_ref() {
            Some(pipeline) => pipeline.force_flush(cx).await,
            None => Ok(()),
        }
    }

    /// Flush and release the trace pipeline
    ///
    /// Only the first call does any work; later calls, and calls on a client
    /// that never had a pipeline, return `Ok(())`.
    pub async fn shutdown(&self, cx: &CallContext) -> Result<(), TelemetryError> {
        let pipeline = self.pipeline.lock().await.take();
        match pipeline {
            Some(pipeline) => pipeline.shutdown(cx).await,
            None => Ok(()),
        }
    }
}

/// Builder for [`TelemetryClient`]
#[derive(Debug)]
pub struct TelemetryClientBuilder {
    config: Config,
    pipeline: Option<TracePipeline>,
    rate_limiter: Option<RateLimiter>,
    http_client: Option<reqwest::Client>,
}

impl TelemetryClientBuilder {
    /// Trace pipeline whose tracer the client uses
    pub fn pipeline(mut self, pipeline: TracePipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Replace the limiter built from `Config::rate_limit`
    pub fn rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// HTTP client for log delivery instead of one built from the config
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<TelemetryClient, TelemetryError> {
        let shipper = match self.http_client {
            Some(client) => LogShipper::with_client(&self.config, client),
            None => LogShipper::new(&self.config)?,
        };
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| RateLimiter::from_config(&self.config.rate_limit));
        let tracer = self.pipeline.as_ref().and_then(TracePipeline::tracer);

        Ok(TelemetryClient {
            tracer,
            rate_limiter,
            shipper,
            config: Arc::new(self.config),
            pipeline: Mutex::new(self.pipeline),
        })
    }
}

/// Handle to a span started with [`TelemetryClient::start_trace`]
///
/// Clones refer to the same span. The span ends on [`end`](Self::end), or
/// once the handle and every context derived from it are dropped.
#[derive(Debug, Clone)]
pub struct SpanHandle {
    cx: Context,
}

impl SpanHandle {
    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    pub fn set_attributes(&self, attributes: impl IntoIterator<Item = KeyValue>) {
        let span = self.cx.span();
        for attribute in attributes {
            span.set_attribute(attribute);
        }
    }

    /// Add a timestamped event to the span
    pub fn add_event(&self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.cx.span().add_event(name, attributes);
    }

    /// Record `err` as an exception event and mark the span as failed
    pub fn record_error(&self, err: &dyn StdError) {
        let span = self.cx.span();
        span.record_error(err);
        span.set_status(Status::error(err.to_string()));
    }

    pub fn set_status(&self, status: Status) {
        self.cx.span().set_status(status);
    }

    /// Trace and span ids assigned by the pipeline
    pub fn span_context(&self) -> SpanContext {
        self.cx.span().span_context().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.cx.span().is_recording()
    }

    /// End the span now
    pub fn end(&self) {
        self.cx.span().end();
    }

    /// OpenTelemetry context carrying this span
    pub fn context(&self) -> &Context {
        &self.cx
    }
}
