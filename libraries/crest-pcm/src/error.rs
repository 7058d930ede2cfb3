//! Error types for PCM encoding

use thiserror::Error;

/// Result type for encoding operations
pub type Result<T> = std::result::Result<T, EncodeError>;

/// Errors that can occur while quantizing or writing WAV data
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Bit depth other than 16 or 24
    #[error("Unsupported bit depth: {0} (must be 16 or 24)")]
    UnsupportedBitDepth(u16),

    /// Zero sample rate in the header
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Zero-frame chunks
    #[error("Chunk size must be at least one frame")]
    InvalidChunkSize,

    /// More channels than a WAV header can describe
    #[error("Too many channels for a WAV header: {0}")]
    TooManyChannels(usize),

    /// Payload does not fit the 32-bit RIFF size fields
    #[error("PCM payload of {0} bytes exceeds the RIFF size limit")]
    PayloadTooLarge(u64),

    /// Bytes that are not a canonical 44-byte PCM header
    #[error("Invalid WAV header: {0}")]
    InvalidHeader(String),

    /// `finish` called before every chunk was encoded
    #[error("Encoding incomplete: {done} of {total} frames written")]
    Incomplete { done: usize, total: usize },

    /// Cancelled by the caller at a chunk boundary
    #[error("Encoding cancelled")]
    Cancelled,

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncodeError {
    /// Whether the caller cancelled the encode
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<EncodeError> for crest_core::CrestError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Cancelled => Self::Cancelled,
            EncodeError::Io(e) => Self::Io(e),
            EncodeError::UnsupportedBitDepth(_)
            | EncodeError::InvalidSampleRate(_)
            | EncodeError::InvalidChunkSize => Self::InvalidConfiguration(err.to_string()),
            _ => Self::Encode(err.to_string()),
        }
    }
}
