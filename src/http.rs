//! Shared HTTP client construction
//!
//! Both the log shipper and the OTLP trace transport use a `reqwest` client
//! built here, so the configured transport security applies to both paths.

use crate::config::TransportSecurity;
use crate::error::TelemetryError;
use std::time::Duration;

/// Build a `reqwest` client with a fixed request timeout
///
/// In certificate mode the PEM file is read and added as a trusted root; a
/// missing or unparsable file is a [`TelemetryError::Config`].
pub(crate) fn build_client(
    security: &TransportSecurity,
    timeout: Duration,
) -> Result<reqwest::Client, TelemetryError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let TransportSecurity::Certificate(path) = security {
        let pem = std::fs::read(path).map_err(|e| {
            TelemetryError::Config(format!(
                "failed to read certificate {}: {}",
                path.display(),
                e
            ))
        })?;
        let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            TelemetryError::Config(format!(
                "invalid certificate {}: {}",
                path.display(),
                e
            ))
        })?;
        builder = builder.add_root_certificate(certificate);
    }

    builder
        .build()
        .map_err(|e| TelemetryError::Config(format!("failed to build HTTP client: {}", e)))
}
