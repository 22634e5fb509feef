//! HTTP delivery of log records

use super::{IntoLevel, Level, LogRecord};
use crate::config::Config;
use crate::context::CallContext;
use crate::error::{TelemetryError, TransportError};
use crate::http::build_client;
use opentelemetry::KeyValue;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Ingestion path appended to the configured log endpoint
pub const INGEST_PATH: &str = "/loki/api/v1/raw";

/// Client-side timeout for one log POST
pub const LOG_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts [`LogRecord`]s to the log endpoint
#[derive(Debug, Clone)]
pub struct LogShipper {
    client: reqwest::Client,
    url: String,
    service_name: String,
}

impl LogShipper {
    /// Create a shipper with its own HTTP client (10 second timeout)
    pub fn new(config: &Config) -> Result<Self, TelemetryError> {
        let client = build_client(&config.transport_security(), LOG_REQUEST_TIMEOUT)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a shipper around an existing HTTP client
    pub fn with_client(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            url: format!("{}{}", config.log_endpoint.trim_end_matches('/'), INGEST_PATH),
            service_name: config.service_name.clone(),
        }
    }

    /// Full URL records are posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check level and message before any side effect
    pub fn validate<L: IntoLevel>(level: L, message: &str) -> Result<Level, TelemetryError> {
        let level = level.into_level()?;
        if message.is_empty() {
            return Err(TelemetryError::Validation(
                "log message cannot be empty".to_string(),
            ));
        }
        Ok(level)
    }

    /// Build the record for this call, stamping service name and request id
    pub fn record(
        &self,
        cx: &CallContext,
        level: Level,
        message: &str,
        attributes: &[KeyValue],
    ) -> LogRecord {
        LogRecord::new(level, message, &self.service_name, cx.request_id())
            .with_attributes(attributes)
    }

    /// Serialize and POST one record
    ///
    /// Connection errors, timeouts and context cancellation return a
    /// [`TransportError`] without a response. A status >= 300 returns a
    /// [`TransportError`] carrying the response; its body is left unread.
    pub async fn send(
        &self,
        cx: &CallContext,
        record: &LogRecord,
    ) -> Result<reqwest::Response, TelemetryError> {
        let body = record.to_json().map_err(|e| {
            TransportError::request(format!("failed to marshal log record: {}", e), None)
        })?;

        echo(record);

        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();

        let result = tokio::select! {
            biased;
            _ = cx.done() => {
                tracing::error!(
                    service_name = %record.service_name,
                    request_id = %record.request_id,
                    reason = cx.done_reason(),
                    "Log delivery aborted"
                );
                return Err(TransportError::request(
                    format!("failed to send request: {}", cx.done_reason()),
                    None,
                )
                .into());
            }
            result = request => result,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    service_name = %record.service_name,
                    request_id = %record.request_id,
                    "Failed to send log record"
                );
                let message = format!("failed to send request: {}", e);
                return Err(TransportError::request(message, Some(e)).into());
            }
        };

        if response.status().as_u16() >= 300 {
            tracing::error!(
                status_code = response.status().as_u16(),
                service_name = %record.service_name,
                request_id = %record.request_id,
                "Received non-success status code from log endpoint"
            );
            return Err(TransportError::status(response).into());
        }

        tracing::debug!(
            status_code = response.status().as_u16(),
            service_name = %record.service_name,
            request_id = %record.request_id,
            "Log record sent"
        );

        Ok(response)
    }
}

/// Mirror the record into the local `tracing` output at its own severity
fn echo(record: &LogRecord) {
    let service_name = record.service_name.as_str();
    let request_id = record.request_id.as_str();
    let message = record.message.as_str();

    match record.level {
        Level::Debug => tracing::debug!(service_name, request_id, "{}", message),
        Level::Info => tracing::info!(service_name, request_id, "{}", message),
        Level::Warn => tracing::warn!(service_name, request_id, "{}", message),
        Level::Error | Level::Fatal | Level::Panic => {
            tracing::error!(service_name, request_id, level = %record.level, "{}", message)
        }
    }
}
