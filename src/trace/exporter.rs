//! OTLP/HTTP span exporter
//!
//! The exporter comes from `opentelemetry-otlp`; requests go out through the
//! crate's own `reqwest` client so the configured certificate applies to
//! trace export as well.

use crate::config::Config;
use crate::error::TelemetryError;
use crate::http::build_client;
use async_trait::async_trait;
use bytes::Bytes;
use opentelemetry_http::{HttpClient, HttpError};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::export::trace::SpanExporter;
use std::time::Duration;

/// Adapts a `reqwest` client to the transport interface the OTLP exporter
/// expects
#[derive(Debug, Clone)]
pub struct OtlpHttpClient {
    inner: reqwest::Client,
}

impl OtlpHttpClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl HttpClient for OtlpHttpClient {
    async fn send(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Bytes>, HttpError> {
        let (parts, body) = request.into_parts();

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())?;
        let mut builder = self
            .inner
            .request(method, parts.uri.to_string())
            .body(body);
        for (name, value) in parts.headers.iter() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(http::Response::builder().status(status).body(body)?)
    }
}

/// Build the OTLP/HTTP exporter bound to the configured trace endpoint
pub(crate) fn build_span_exporter(config: &Config) -> Result<impl SpanExporter, TelemetryError> {
    let timeout = Duration::from_secs(config.batch.export_timeout_seconds);
    let client = build_client(&config.transport_security(), timeout)?;

    opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(config.trace_endpoint_url())
        .with_timeout(timeout)
        .with_http_client(OtlpHttpClient::new(client))
        .build_span_exporter()
        .map_err(|e| TelemetryError::Config(format!("failed to build OTLP exporter: {}", e)))
}
