//! JSON log record sent to the ingestion endpoint

use super::Level;
use chrono::{SecondsFormat, Utc};
use opentelemetry::{Array, KeyValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation id used when the caller's context carries none
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// One structured log record
///
/// Field names are the wire contract with the log endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC3339 timestamp captured when the record was built
    pub timestamp: String,
    pub level: Level,
    pub message: String,
    /// Always `false` for records produced by this client
    pub is_secret: bool,
    pub service_name: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    pub fn new(
        level: Level,
        message: impl Into<String>,
        service_name: impl Into<String>,
        request_id: Option<&str>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            level,
            message: message.into(),
            is_secret: false,
            service_name: service_name.into(),
            request_id: request_id.unwrap_or(UNKNOWN_REQUEST_ID).to_string(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach extra attributes; later keys overwrite earlier ones
    pub fn with_attributes(mut self, attributes: &[KeyValue]) -> Self {
        for kv in attributes {
            self.attributes
                .insert(kv.key.as_str().to_string(), value_to_json(&kv.value));
        }
        self
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::I64(i) => serde_json::Value::from(*i),
        Value::F64(f) => serde_json::Value::from(*f),
        Value::String(s) => serde_json::Value::String(s.as_str().to_string()),
        Value::Array(array) => match array {
            Array::Bool(values) => values.iter().copied().collect(),
            Array::I64(values) => values.iter().copied().collect(),
            Array::F64(values) => values.iter().copied().collect(),
            Array::String(values) => values.iter().map(|s| s.as_str()).collect(),
        },
    }
}
