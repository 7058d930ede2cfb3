//! Loudness measurement, normalization and limiting for Crest
//!
//! This crate provides:
//! - K-weighting (BS.1770 pre-filter) built from RBJ biquads
//! - Integrated loudness (LUFS), loudness range and sample peak
//! - 4x Catmull-Rom true-peak estimation
//! - Loudness normalization to a target with ceiling protection
//! - An offline two-pass lookahead limiter
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ SampleBuffer │ ──► │ K-Weighting  │ ──► │ Block Gating  │ ──► LUFS
//! └──────────────┘     └──────────────┘     └───────────────┘
//!        │
//!        └───────────► ┌──────────────┐
//!                      │  True Peak   │ ──► dBTP
//!                      └──────────────┘
//!
//! Normalization:
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ SampleBuffer │ ──► │  Gain Apply  │ ──► │   Limiter     │ (only if the
//! └──────────────┘     └──────────────┘     └───────────────┘  projected peak
//!                                                               exceeds the ceiling)
//! ```
//!
//! # Example
//!
//! ```
//! use crest_core::SampleBuffer;
//! use crest_loudness::{integrated_loudness, LoudnessNormalizer};
//!
//! let samples: Vec<f32> = (0..48_000)
//!     .map(|i| 0.05 * (i as f32 * 0.13).sin())
//!     .collect();
//! let buffer = SampleBuffer::new(48_000, vec![samples]).unwrap();
//!
//! let normalizer = LoudnessNormalizer::new(-14.0, -1.0).unwrap();
//! let louder = normalizer.normalize(buffer).unwrap();
//!
//! let lufs = integrated_loudness(&louder).unwrap().lufs();
//! assert!((lufs + 14.0).abs() < 0.1);
//! ```

#![deny(unsafe_code)]

pub mod analyzer;
pub mod biquad;
mod error;
pub mod kweighting;
pub mod limiter;
mod normalizer;
pub mod true_peak;

pub use analyzer::{integrated_loudness, LoudnessAnalyzer, LoudnessMeasurement, LoudnessReport};
pub use biquad::{Biquad, BiquadCoefficients};
pub use error::{LoudnessError, Result};
pub use kweighting::KWeighting;
pub use limiter::{GainEnvelope, LookaheadLimiter};
pub use normalizer::{LoudnessNormalizer, NormalizationOutcome, NormalizationReport, SkipReason};
pub use true_peak::{position_peaks, true_peak_dbtp, true_peak_linear, TruePeak};

/// Convert decibels to a linear amplitude factor
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels (`-inf` for zero or less)
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * linear.log10()
}
