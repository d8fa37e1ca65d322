//! Common error types for readyprobe.

use thiserror::Error;

/// Common error type for readyprobe operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Timed out after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    #[error("Probe '{probe}' failed to execute: {reason}")]
    ProbeExecution { probe: String, reason: String },

    #[error("Control '{control}' failed to execute: {reason}")]
    ControlExecution { control: String, reason: String },

    #[error("Load test failed: {0}")]
    LoadTest(String),

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("Report persistence failed: {0}")]
    Persistence(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
