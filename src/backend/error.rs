//! Backend error types

use thiserror::Error;

/// Failure talking to the question store, grader or stream endpoints
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Status, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Decode, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Io, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection, timeout or mid-stream transport failure
    Network,
    /// Non-success HTTP status
    Status,
    /// Response body did not match the expected shape
    Decode,
    /// Service answered with an explicit error payload
    Rejected,
    /// Local file access
    Io,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(format!("Invalid response body: {e}"))
        } else if let Some(status) = e.status() {
            Self::status(format!("HTTP {status}: {e}"))
        } else {
            Self::network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}
