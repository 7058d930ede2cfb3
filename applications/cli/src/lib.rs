//! Crest command-line library
//!
//! WAV input, settings loading and the end-to-end mastering pipeline used
//! by the `crest` binary. Exposed as a library for testing purposes.

pub mod config;
pub mod error;
pub mod input;
pub mod pipeline;

pub use config::{load_settings, resolve_settings, SettingsOverrides};
pub use error::{CliError, Result};
pub use pipeline::{analyze, encode, master, MasteredTrack};
