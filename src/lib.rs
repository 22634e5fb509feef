//! Alloy Telemetry Library
//!
//! Telemetry client facade for services that report to an OTLP trace
//! collector and a Loki-style log endpoint.
//!
//! # Features
//!
//! - **Traces**: OTLP/HTTP export with batch processing; the tracer is
//!   injected, never registered globally
//! - **Logs**: structured JSON records shipped over HTTP behind a token-bucket
//!   rate limiter
//! - **Transport Security**: optional certificate applied to both paths
//! - **Shutdown**: explicit, one-shot flush of queued spans
//!
//! # Example
//!
//! ```no_run
//! use alloy_telemetry::{CallContext, Config, Level, TelemetryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TelemetryClient::new(Config::from_env())?;
//!     let cx = CallContext::new().with_request_id("abc-123");
//!
//!     client.add_titled_span(&cx, "startup", "phase", "ready")?;
//!     client.add_log(&cx, Level::Info, "service started", &[]).await?;
//!
//!     client.shutdown(&CallContext::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
mod http;
pub mod log;
pub mod ratelimit;
pub mod trace;

// Re-export commonly used types
pub use client::{SpanHandle, TelemetryClient, TelemetryClientBuilder};
pub use config::Config;
pub use context::CallContext;
pub use error::{TelemetryError, TransportError};
pub use log::{IntoLevel, Level, LogRecord};
pub use ratelimit::RateLimiter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
