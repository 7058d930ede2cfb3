//! Crest Core
//!
//! Platform-agnostic value types and error handling shared by the Crest
//! mastering libraries and applications.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio Types**: [`SampleBuffer`], a planar multi-channel float buffer
//! - **Configuration**: [`MasteringSettings`], [`BitDepth`], [`DitherMode`], [`TargetPreset`]
//! - **Error Handling**: Unified [`CrestError`] and [`Result`] types
//!
//! # Example
//!
//! ```rust
//! use crest_core::{MasteringSettings, SampleBuffer, TargetPreset};
//!
//! let buffer = SampleBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2], 2, 48_000).unwrap();
//! assert_eq!(buffer.frames(), 2);
//!
//! let settings = MasteringSettings::from_preset(TargetPreset::Broadcast);
//! assert_eq!(settings.target_lufs, -23.0);
//! settings.validate().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod settings;

pub use buffer::SampleBuffer;
pub use error::{CrestError, Result};
pub use settings::{BitDepth, DitherMode, MasteringSettings, TargetPreset};

/// Streaming platform reference level (-14 LUFS)
pub const STREAMING_REFERENCE_LUFS: f64 = -14.0;

/// Apple Music / podcast reference level (-16 LUFS)
pub const APPLE_MUSIC_REFERENCE_LUFS: f64 = -16.0;

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Default true-peak ceiling in dBTP
pub const DEFAULT_CEILING_DBTP: f64 = -1.0;
