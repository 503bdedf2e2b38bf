//! Error types shared by the call bridge components.
//!
//! Every external-call failure is expressed as a [`BridgeError`]. The
//! components that sit on a fallback boundary (reply generation, speech
//! rendering) convert these errors into local fallback values; only
//! [`BridgeError::TransportClosed`] ends a call.

use thiserror::Error;

/// Errors that can occur while bridging a call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// The audio container is missing a required chunk or is truncated
    #[error("Malformed audio container: {0}")]
    MalformedContainer(String),

    /// The audio container uses an encoding/bit depth we cannot decode
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// A recognizer, reply or synthesis service could not be reached or
    /// answered with a failure status
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A bounded wait on an upstream service elapsed
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The telephony peer went away mid-delivery
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// Missing credentials or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A telephony message could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The process already carries its configured maximum of calls
    #[error("Call capacity reached: {0}")]
    CapacityExceeded(usize),
}

/// Result type for call bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BridgeError::Timeout(err.to_string())
        } else {
            BridgeError::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for BridgeError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        BridgeError::Timeout(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(err.to_string())
    }
}
