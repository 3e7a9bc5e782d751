//! Error types for backend requests.

use thiserror::Error;

/// Errors that can occur when talking to the telemetry backend.
///
/// These never leave [`BackendClient`](super::BackendClient)'s resource
/// operations: each one is logged and replaced by the resource's empty value.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, reset, DNS failure, etc.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("Backend returned status {0}")]
    Status(u16),

    /// The body could not be decoded into the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The HTTP client itself could not be built.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Coarse failure class used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network or connection level failure.
    Transport,
    /// Non-success status.
    Protocol,
    /// Malformed or unexpected payload.
    Shape,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Transport => "transport",
            FailureClass::Protocol => "protocol",
            FailureClass::Shape => "shape",
        }
    }
}

impl FetchError {
    /// The failure class of this error.
    pub fn class(&self) -> FailureClass {
        match self {
            FetchError::Connection(_) | FetchError::Timeout | FetchError::Config(_) => {
                FailureClass::Transport
            }
            FetchError::Status(_) => FailureClass::Protocol,
            FetchError::Parse(_) => FailureClass::Shape,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}
