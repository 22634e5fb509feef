//! Trace export pipeline initialization and lifecycle
//!
//! Builds the OTLP exporter, attaches the service resource, and wires a
//! batch span processor on the Tokio runtime. The tracer is handed back to
//! the caller instead of being registered globally.

use super::exporter::build_span_exporter;
use crate::config::Config;
use crate::context::CallContext;
use crate::error::TelemetryError;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, Tracer, TracerProvider};
use opentelemetry_sdk::Resource;
use std::fmt;
use std::time::Duration;

/// Owner of the export pipeline
///
/// Shutting down drains the batch queue into the exporter and releases it.
/// A pipeline dropped without [`shutdown`](Self::shutdown) is released on a
/// helper thread, since processor shutdown blocks on the export task.
pub struct TracePipeline {
    provider: Option<TracerProvider>,
    tracer_name: String,
}

impl fmt::Debug for TracePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracePipeline")
            .field("active", &self.provider.is_some())
            .field("tracer_name", &self.tracer_name)
            .finish()
    }
}

impl TracePipeline {
    /// Build the OTLP/HTTP pipeline for `config`
    ///
    /// Must be called from within a Tokio runtime: the batch processor spawns
    /// its export task on it.
    pub fn install(config: &Config) -> Result<Self, TelemetryError> {
        let exporter = build_span_exporter(config)?;
        let pipeline = Self::with_exporter(config, exporter);

        tracing::info!(
            endpoint = %config.trace_endpoint_url(),
            service_name = %config.service_name,
            tracer_name = %config.tracer_name,
            "Trace pipeline initialized"
        );

        Ok(pipeline)
    }

    /// Build a pipeline around any span exporter
    pub fn with_exporter<E>(config: &Config, exporter: E) -> Self
    where
        E: SpanExporter + 'static,
    {
        let batch = &config.batch;
        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_max_queue_size(batch.max_queue_size)
            .with_scheduled_delay(Duration::from_millis(batch.scheduled_delay_millis))
            .with_max_export_batch_size(batch.max_export_batch_size)
            .build();

        let resource = Resource::default().merge(&Resource::new(vec![KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]));

        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_config(sdktrace::config().with_resource(resource))
            .build();

        Self {
            provider: Some(provider),
            tracer_name: config.tracer_name.clone(),
        }
    }

    /// Tracer bound to this pipeline, `None` once shut down
    pub fn tracer(&self) -> Option<Tracer> {
        self.provider
            .as_ref()
            .map(|provider| provider.tracer(self.tracer_name.clone()))
    }

    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// Export everything queued so far without shutting down
    pub async fn force_flush(&self, cx: &CallContext) -> Result<(), TelemetryError> {
        let Some(provider) = self.provider.clone() else {
            return Ok(());
        };
        into_result(flush_off_runtime(provider, cx).await)
    }

    /// Drain the queue, flush it to the exporter and release the pipeline
    ///
    /// Bounded by the context: if it is cancelled or its deadline passes first
    /// the flush keeps going in the background and a
    /// [`TelemetryError::Shutdown`] is returned.
    ///
    /// Only failures of the final flush are reported. Spans that end after
    /// the flush are exported while the processor closes, and export errors
    /// at that point go to the OpenTelemetry global error handler instead.
    pub async fn shutdown(mut self, cx: &CallContext) -> Result<(), TelemetryError> {
        let Some(provider) = self.provider.take() else {
            return Ok(());
        };

        let result = into_result(flush_off_runtime(provider, cx).await);
        match &result {
            Ok(()) => tracing::info!("Trace pipeline shut down"),
            Err(e) => tracing::error!(error = %e, "Errors occurred during trace pipeline shutdown"),
        }
        result
    }
}

impl Drop for TracePipeline {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            let spawned = std::thread::Builder::new()
                .name("alloy-trace-release".to_string())
                .spawn(move || drop(provider));
            if let Err(e) = spawned {
                tracing::warn!(
                    error = %e,
                    "Failed to spawn trace release thread; provider released in place"
                );
            }
        }
    }
}

/// Build the pipeline and return its tracer alongside it
pub fn init_tracer(config: &Config) -> Result<(Tracer, TracePipeline), TelemetryError> {
    let pipeline = TracePipeline::install(config)?;
    let tracer = pipeline
        .tracer()
        .ok_or_else(|| TelemetryError::Config("trace pipeline has no provider".to_string()))?;
    Ok((tracer, pipeline))
}

/// Flush on the blocking pool; the provider (and its last strong reference,
/// when this was it) is dropped there too.
async fn flush_off_runtime(provider: TracerProvider, cx: &CallContext) -> Vec<String> {
    let task = tokio::task::spawn_blocking(move || {
        let errors: Vec<String> = provider
            .force_flush()
            .into_iter()
            .filter_map(Result::err)
            .map(|e| format!("failed to flush spans: {}", e))
            .collect();
        drop(provider);
        errors
    });

    tokio::select! {
        biased;
        _ = cx.done() => vec![format!("failed to shutdown tracer: {}", cx.done_reason())],
        joined = task => match joined {
            Ok(errors) => errors,
            Err(e) => vec![format!("flush task failed: {}", e)],
        },
    }
}

fn into_result(errors: Vec<String>) -> Result<(), TelemetryError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TelemetryError::Shutdown(errors))
    }
}
