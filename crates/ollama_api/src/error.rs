use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug)]
pub enum ChatApiError {
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    StreamFailed { message: String },
    Cancelled,
}

/// Error body shape served by the chat endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(key) => write!(f, "invalid header value for {key}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::StreamFailed { message } => write!(f, "stream failed: {message}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ChatApiError {}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl ChatApiError {
    /// True when this error is the cancellation outcome rather than a
    /// reportable failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Extract a user-facing message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.error.filter(|value| !value.trim().is_empty()) {
            return message;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
