//! Optional process logging setup
//!
//! Installs a layered `tracing` subscriber:
//!
//! ```text
//! Registry
//!   ├── OpenTelemetry Layer (only when a tracer is given)
//!   ├── EnvFilter (RUST_LOG, else the configured directive)
//!   └── Fmt Layer (plain or JSON)
//! ```
//!
//! With a tracer from [`TelemetryClient::tracer`](crate::TelemetryClient::tracer),
//! spans created through the `tracing` macros are exported through the same
//! pipeline as spans created by the client.
//!
//! # Example
//!
//! ```no_run
//! use alloy_telemetry::trace::{init_subscriber, SubscriberOptions};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_subscriber(&SubscriberOptions::default(), None)?;
//! tracing::info!("console logging ready");
//! # Ok(())
//! # }
//! ```

use crate::error::TelemetryError;
use opentelemetry_sdk::trace::Tracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Console output settings
#[derive(Debug, Clone)]
pub struct SubscriberOptions {
    /// Filter used when `RUST_LOG` is not set
    pub default_directive: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
        }
    }
}

/// Install the global subscriber
///
/// Fails with [`TelemetryError::Config`] if a global subscriber is already
/// set.
pub fn init_subscriber(
    options: &SubscriberOptions,
    tracer: Option<Tracer>,
) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_directive))
        .map_err(|e| TelemetryError::Config(format!("invalid log filter: {}", e)))?;

    let telemetry_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let (plain_layer, json_layer) = if options.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(plain_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| {
            TelemetryError::Config(format!(
                "Failed to set global subscriber (may already be initialized): {}",
                e
            ))
        })
}
