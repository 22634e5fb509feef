//! OpenTelemetry trace export
//!
//! # Features
//!
//! - OTLP/HTTP export through the crate's `reqwest` client
//! - Insecure or certificate-based transport, chosen by configuration
//! - Batch span processing on the Tokio runtime
//! - Explicit shutdown with span flushing
//! - Optional bridge from `tracing` spans into the same pipeline
//!
//! # Example
//!
//! ```no_run
//! use alloy_telemetry::config::Config;
//! use alloy_telemetry::context::CallContext;
//! use alloy_telemetry::trace::init_tracer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (tracer, pipeline) = init_tracer(&Config::from_env())?;
//! // hand `tracer` to whatever needs it
//! pipeline.shutdown(&CallContext::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod exporter;
pub mod init;
pub mod subscriber;

pub use init::{init_tracer, TracePipeline};
pub use subscriber::{init_subscriber, SubscriberOptions};
