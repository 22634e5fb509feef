//! Configuration module for the telemetry client
//!
//! Settings are resolved once, at client construction, either from
//! environment variables with fixed fallback defaults or from a YAML file with
//! `${VAR}` expansion. Values are taken as-is; nothing here validates them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment keys and defaults
// ============================================================================

/// Trace (OTLP/HTTP) collector endpoint
pub const ENV_TRACE_ENDPOINT: &str = "ALLOY_ENDPOINT";
/// Log ingestion endpoint
pub const ENV_LOG_ENDPOINT: &str = "ALLOY_LOG_ENDPOINT";
/// Service name attached to spans and log records
pub const ENV_SERVICE_NAME: &str = "ALLOY_SERVICE_NAME";
/// Instrumentation name of the tracer
pub const ENV_TRACER_NAME: &str = "ALLOY_TRACER_NAME";
/// PEM certificate used to trust the collector
pub const ENV_CERT_PATH: &str = "ALLOY_CERT_PATH";

const DEFAULT_TRACE_ENDPOINT: &str = "localhost:4318";
const DEFAULT_LOG_ENDPOINT: &str = "http://localhost:3100";
const DEFAULT_SERVICE_NAME: &str = "addi";
const DEFAULT_TRACER_NAME: &str = "addi-tracer";

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports `${VAR_NAME}` (placeholder kept when unset) and
/// `${VAR_NAME:-default}`.
fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// `deserialize_with` hook expanding `${VAR}` in string fields
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

/// Same as [`deserialize_with_env`] for the optional certificate path
fn deserialize_path_with_env<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| expand_env_vars(&s))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from))
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// How the trace exporter (and the log client) secure their connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSecurity {
    /// Plain HTTP, or HTTPS against the built-in web PKI roots
    Insecure,
    /// HTTPS trusting the PEM certificate at this path
    Certificate(PathBuf),
}

impl TransportSecurity {
    fn default_scheme(&self) -> &'static str {
        match self {
            TransportSecurity::Insecure => "http://",
            TransportSecurity::Certificate(_) => "https://",
        }
    }
}

/// Resolved client settings
///
/// Created once and never mutated by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// OTLP/HTTP collector endpoint, with or without scheme
    #[serde(
        default = "default_trace_endpoint",
        deserialize_with = "deserialize_with_env"
    )]
    pub trace_endpoint: String,

    /// Base URL of the log ingestion endpoint
    #[serde(
        default = "default_log_endpoint",
        deserialize_with = "deserialize_with_env"
    )]
    pub log_endpoint: String,

    #[serde(
        default = "default_service_name",
        deserialize_with = "deserialize_with_env"
    )]
    pub service_name: String,

    #[serde(
        default = "default_tracer_name",
        deserialize_with = "deserialize_with_env"
    )]
    pub tracer_name: String,

    /// Optional PEM certificate; switches transport to certificate mode
    #[serde(default, deserialize_with = "deserialize_path_with_env")]
    pub cert_path: Option<PathBuf>,

    /// Batch span processor tuning
    #[serde(default)]
    pub batch: BatchConfig,

    /// Initial token-bucket settings for the log path
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Resolve settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, fallback: &str| lookup(key).unwrap_or_else(|| fallback.to_string());

        Self {
            trace_endpoint: get(ENV_TRACE_ENDPOINT, DEFAULT_TRACE_ENDPOINT),
            log_endpoint: get(ENV_LOG_ENDPOINT, DEFAULT_LOG_ENDPOINT),
            service_name: get(ENV_SERVICE_NAME, DEFAULT_SERVICE_NAME),
            tracer_name: get(ENV_TRACER_NAME, DEFAULT_TRACER_NAME),
            cert_path: lookup(ENV_CERT_PATH)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            batch: BatchConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Transport security mode implied by the certificate setting
    pub fn transport_security(&self) -> TransportSecurity {
        match &self.cert_path {
            Some(path) => TransportSecurity::Certificate(path.clone()),
            None => TransportSecurity::Insecure,
        }
    }

    /// Trace endpoint as a URL, adding a scheme when none was configured
    pub fn trace_endpoint_url(&self) -> String {
        let endpoint = self.trace_endpoint.trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!(
                "{}{}",
                self.transport_security().default_scheme(),
                endpoint
            )
        }
    }
}

fn default_trace_endpoint() -> String {
    DEFAULT_TRACE_ENDPOINT.to_string()
}

fn default_log_endpoint() -> String {
    DEFAULT_LOG_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_tracer_name() -> String {
    DEFAULT_TRACER_NAME.to_string()
}

/// Batch span processor configuration.
///
/// Spans are exported when either the batch size or the scheduled delay
/// threshold is reached.
///
/// ```yaml
/// batch:
///   max_queue_size: 2048
///   scheduled_delay_millis: 5000
///   max_export_batch_size: 512
///   export_timeout_seconds: 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of spans queued before new ones are dropped. Default: 2048
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Delay in milliseconds between scheduled exports. Default: 5000
    #[serde(default = "default_scheduled_delay")]
    pub scheduled_delay_millis: u64,

    /// Maximum number of spans per export batch. Default: 512
    #[serde(default = "default_max_export_batch_size")]
    pub max_export_batch_size: usize,

    /// Timeout for a single OTLP export request in seconds. Default: 10
    #[serde(default = "default_export_timeout")]
    pub export_timeout_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            scheduled_delay_millis: default_scheduled_delay(),
            max_export_batch_size: default_max_export_batch_size(),
            export_timeout_seconds: default_export_timeout(),
        }
    }
}

fn default_max_queue_size() -> usize {
    2048
}

fn default_scheduled_delay() -> u64 {
    5000
}

fn default_max_export_batch_size() -> usize {
    512
}

fn default_export_timeout() -> u64 {
    10
}

/// Token-bucket settings for log shipping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Refill rate in tokens per second. Default: 10
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Bucket capacity. Default: 20
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            burst: default_burst(),
        }
    }
}

fn default_rate() -> f64 {
    10.0
}

fn default_burst() -> u32 {
    20
}
