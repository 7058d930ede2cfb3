/// CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not decode {path}: {message}")]
    Decode { path: String, message: String },

    #[error(transparent)]
    Core(#[from] crest_core::CrestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_cancelled())
    }
}

impl From<crest_loudness::LoudnessError> for CliError {
    fn from(err: crest_loudness::LoudnessError) -> Self {
        Self::Core(err.into())
    }
}

impl From<crest_pcm::EncodeError> for CliError {
    fn from(err: crest_pcm::EncodeError) -> Self {
        Self::Core(err.into())
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
