use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key '{key}'")]
    InvalidKey { key: String },

    #[error("failed to parse stored document for key '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize document for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored document for key '{key}' has unsupported version {found}; expected {expected}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        expected: u32,
    },

    #[error("stored document for key '{key}' has invalid RFC3339 timestamp: {value}")]
    InvalidTimestamp { key: String, value: String },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl StoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
