//! Error types for loudness processing

use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness measurement, normalization or limiting
///
/// Silence and too-short buffers are not errors; see
/// [`LoudnessMeasurement`](crate::LoudnessMeasurement).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoudnessError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(usize),

    /// Buffer sample rate differs from the one the analyzer was built for
    #[error("Sample rate mismatch: analyzer expects {expected} Hz, buffer is {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    /// Target loudness outside the accepted range
    #[error("Invalid target loudness: {0} LUFS")]
    InvalidTarget(f64),

    /// Ceiling outside the accepted range
    #[error("Invalid ceiling: {0}")]
    InvalidCeiling(f64),

    /// Gain envelope applied to a buffer of a different length
    #[error("Gain envelope has {envelope} positions but the buffer has {frames} frames")]
    EnvelopeLengthMismatch { envelope: usize, frames: usize },

    /// Non-positive lookahead or release time
    #[error("Invalid limiter timing: {0}")]
    InvalidTiming(String),
}

impl From<LoudnessError> for crest_core::CrestError {
    fn from(err: LoudnessError) -> Self {
        match err {
            LoudnessError::InvalidTarget(_)
            | LoudnessError::InvalidCeiling(_)
            | LoudnessError::InvalidTiming(_) => Self::InvalidConfiguration(err.to_string()),
            _ => Self::Loudness(err.to_string()),
        }
    }
}
