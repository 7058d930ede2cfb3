/// Core error types for Crest
use thiserror::Error;

/// Result type alias using `CrestError`
pub type Result<T> = std::result::Result<T, CrestError>;

/// Core error type for Crest
///
/// Numeric edge cases (silence, buffers too short to measure) are not errors;
/// they travel as data through the loudness types. Only configuration misuse,
/// malformed buffers and explicit cancellation end up here.
#[derive(Error, Debug)]
pub enum CrestError {
    /// Unsupported or out-of-range configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed sample buffer (ragged channels, zero sample rate, ...)
    #[error("Invalid sample buffer: {0}")]
    InvalidBuffer(String),

    /// Loudness measurement/processing errors
    #[error("Loudness error: {0}")]
    Loudness(String),

    /// PCM encoding errors
    #[error("Encode error: {0}")]
    Encode(String),

    /// Cooperative cancellation of an encode
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CrestError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an invalid buffer error
    pub fn invalid_buffer(msg: impl Into<String>) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Create a loudness error
    pub fn loudness(msg: impl Into<String>) -> Self {
        Self::Loudness(msg.into())
    }

    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Whether this error is a cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
