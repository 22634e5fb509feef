//! Structured log shipping
//!
//! Builds a [`LogRecord`] per call and POSTs it as JSON to the log
//! ingestion endpoint. Delivery is not retried and failed records are not
//! buffered.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod record;
mod shipper;

pub use record::{LogRecord, UNKNOWN_REQUEST_ID};
pub use shipper::{LogShipper, INGEST_PATH, LOG_REQUEST_TIMEOUT};

/// Severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }

    /// Numeric code used by zerolog-style producers (`debug` = 0 .. `panic` = 5)
    pub fn code(&self) -> i8 {
        match self {
            Level::Debug => 0,
            Level::Info => 1,
            Level::Warn => 2,
            Level::Error => 3,
            Level::Fatal => 4,
            Level::Panic => 5,
        }
    }

    pub fn from_code(code: i8) -> Option<Level> {
        Level::ALL.into_iter().find(|level| level.code() == code)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            _ => Err(invalid_level()),
        }
    }
}

fn invalid_level() -> TelemetryError {
    TelemetryError::Validation("invalid log level".to_string())
}

/// Anything that can name a severity level
///
/// Lets callers pass a [`Level`], a level name or a numeric code; names and
/// codes outside the enumerated set are rejected with
/// [`TelemetryError::Validation`].
pub trait IntoLevel {
    fn into_level(self) -> Result<Level, TelemetryError>;
}

impl IntoLevel for Level {
    fn into_level(self) -> Result<Level, TelemetryError> {
        Ok(self)
    }
}

impl IntoLevel for &str {
    fn into_level(self) -> Result<Level, TelemetryError> {
        self.parse()
    }
}

impl IntoLevel for String {
    fn into_level(self) -> Result<Level, TelemetryError> {
        self.parse()
    }
}

impl IntoLevel for i8 {
    fn into_level(self) -> Result<Level, TelemetryError> {
        Level::from_code(self).ok_or_else(invalid_level)
    }
}

impl IntoLevel for i32 {
    fn into_level(self) -> Result<Level, TelemetryError> {
        i8::try_from(self)
            .ok()
            .and_then(Level::from_code)
            .ok_or_else(invalid_level)
    }
}
