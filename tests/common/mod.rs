//! Shared test infrastructure
//!
//! - In-memory span exporters (capturing and failing)
//! - Clients wired to those exporters or to a mock log endpoint
//! - An echo responder for the log endpoint

#![allow(dead_code)]

use alloy_telemetry::config::Config;
use alloy_telemetry::trace::TracePipeline;
use alloy_telemetry::TelemetryClient;
use futures::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry::Value;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use parking_lot::Mutex;
use std::sync::Arc;
use wiremock::{Request, Respond, ResponseTemplate};

/// Keeps every exported span for later inspection
#[derive(Debug, Clone, Default)]
pub struct CapturingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl CapturingExporter {
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn span_named(&self, name: &str) -> Option<SpanData> {
        self.spans().into_iter().find(|span| span.name == name)
    }
}

impl SpanExporter for CapturingExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().extend(batch);
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Rejects every batch, like an unreachable collector
#[derive(Debug, Clone, Default)]
pub struct FailingExporter;

impl SpanExporter for FailingExporter {
    fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        Box::pin(std::future::ready(Err(TraceError::Other(
            "collector unavailable".into(),
        ))))
    }
}

/// Replies 200 with the request body it received
pub struct EchoResponder;

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_bytes(request.body.clone())
    }
}

/// Client whose spans go to `exporter`
pub fn client_with_exporter<E>(config: Config, exporter: E) -> TelemetryClient
where
    E: SpanExporter + 'static,
{
    let pipeline = TracePipeline::with_exporter(&config, exporter);
    TelemetryClient::builder(config)
        .pipeline(pipeline)
        .build()
        .expect("client should build")
}

/// Client without a trace pipeline, shipping logs to `log_endpoint`
pub fn log_client(log_endpoint: &str) -> TelemetryClient {
    let config = Config {
        log_endpoint: log_endpoint.to_string(),
        ..Config::default()
    };
    TelemetryClient::builder(config)
        .build()
        .expect("client should build")
}

/// Attribute value on an exported span
pub fn attribute(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

/// Address nothing is listening on
pub fn unreachable_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
