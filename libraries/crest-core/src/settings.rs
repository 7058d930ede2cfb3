//! Mastering configuration
//!
//! A single immutable record describing how a buffer is mastered: the
//! loudness target, the true-peak ceiling, limiter timing and the PCM output
//! format. Applications build it from presets, files or flags and validate
//! it once before handing it to the pipeline.

use crate::error::{CrestError, Result};
use crate::{
    APPLE_MUSIC_REFERENCE_LUFS, DEFAULT_CEILING_DBTP, EBU_R128_BROADCAST_LUFS,
    STREAMING_REFERENCE_LUFS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepted loudness targets (LUFS)
pub const TARGET_LUFS_RANGE: std::ops::RangeInclusive<f64> = -70.0..=0.0;

/// Accepted true-peak ceilings (dBTP)
pub const CEILING_DBTP_RANGE: std::ops::RangeInclusive<f64> = -20.0..=0.0;

/// Default encoder chunk size in frames
pub const DEFAULT_CHUNK_FRAMES: usize = 65_536;

/// PCM output bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    /// 16-bit signed PCM
    #[default]
    Sixteen,
    /// 24-bit signed PCM (packed, 3 bytes per sample)
    TwentyFour,
}

impl BitDepth {
    /// Bits per sample as written in the container header
    pub fn bits(self) -> u16 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }

    /// Bytes per sample in the payload
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Sixteen => 2,
            Self::TwentyFour => 3,
        }
    }

    /// Largest positive integer value
    pub fn max_amplitude(self) -> i32 {
        match self {
            Self::Sixteen => i32::from(i16::MAX),
            Self::TwentyFour => 8_388_607,
        }
    }

    /// Smallest representable integer value
    pub fn min_amplitude(self) -> i32 {
        match self {
            Self::Sixteen => i32::from(i16::MIN),
            Self::TwentyFour => -8_388_608,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = CrestError;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(CrestError::invalid_configuration(format!(
                "unsupported bit depth {} (expected 16 or 24)",
                other
            ))),
        }
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Dither applied before rounding to integer PCM
///
/// `NoiseShaped` is accepted for compatibility with existing settings files
/// but is processed exactly like `Tpdf`; no noise-shaping filter exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMode {
    /// Plain rounding
    None,
    /// Triangular-PDF dither, +/-1 LSB
    #[default]
    Tpdf,
    /// Alias of `Tpdf`
    NoiseShaped,
}

impl DitherMode {
    /// Whether any dither noise is injected
    pub fn is_dithered(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "disabled" => Some(Self::None),
            "tpdf" | "triangular" => Some(Self::Tpdf),
            "noise-shaped" | "noise_shaped" | "noiseshaped" => Some(Self::NoiseShaped),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tpdf => "tpdf",
            Self::NoiseShaped => "noise-shaped",
        }
    }
}

/// Named loudness targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetPreset {
    /// Streaming platforms (-14 LUFS)
    Streaming,
    /// Apple Music / podcasts (-16 LUFS)
    AppleMusic,
    /// EBU R128 broadcast (-23 LUFS)
    Broadcast,
    /// Any other target in LUFS
    Custom(f64),
}

impl TargetPreset {
    /// Target loudness in LUFS
    pub fn target_lufs(&self) -> f64 {
        match self {
            Self::Streaming => STREAMING_REFERENCE_LUFS,
            Self::AppleMusic => APPLE_MUSIC_REFERENCE_LUFS,
            Self::Broadcast => EBU_R128_BROADCAST_LUFS,
            Self::Custom(lufs) => *lufs,
        }
    }

    /// Parse from string: a preset name or a plain LUFS number ("-18")
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "streaming" | "spotify" | "youtube" => Some(Self::Streaming),
            "apple-music" | "apple_music" | "podcast" => Some(Self::AppleMusic),
            "broadcast" | "ebu_r128" | "ebur128" => Some(Self::Broadcast),
            other => other
                .trim_start_matches("custom:")
                .trim()
                .parse::<f64>()
                .ok()
                .map(Self::Custom),
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> String {
        match self {
            Self::Streaming => "streaming".to_string(),
            Self::AppleMusic => "apple-music".to_string(),
            Self::Broadcast => "broadcast".to_string(),
            Self::Custom(lufs) => format!("custom:{}", lufs),
        }
    }
}

/// Immutable mastering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteringSettings {
    /// Target integrated loudness in LUFS
    pub target_lufs: f64,
    /// True-peak ceiling in dBTP
    pub ceiling_dbtp: f64,
    /// Limiter lookahead in milliseconds
    pub lookahead_ms: f64,
    /// Limiter release time constant in milliseconds
    pub release_ms: f64,
    /// Output PCM bit depth
    pub bit_depth: BitDepth,
    /// Dither applied when quantizing
    pub dither: DitherMode,
    /// Header sample rate; `None` keeps the source rate.
    /// The payload is never resampled.
    pub output_sample_rate: Option<u32>,
    /// Frames quantized per encoder chunk
    pub chunk_frames: usize,
}

impl Default for MasteringSettings {
    fn default() -> Self {
        Self {
            target_lufs: STREAMING_REFERENCE_LUFS,
            ceiling_dbtp: DEFAULT_CEILING_DBTP,
            lookahead_ms: 3.0,
            release_ms: 50.0,
            bit_depth: BitDepth::Sixteen,
            dither: DitherMode::Tpdf,
            output_sample_rate: None,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

impl MasteringSettings {
    /// Default settings aimed at a preset loudness target
    pub fn from_preset(preset: TargetPreset) -> Self {
        Self::default().with_target_lufs(preset.target_lufs())
    }

    /// Set the loudness target
    #[must_use]
    pub fn with_target_lufs(mut self, target_lufs: f64) -> Self {
        self.target_lufs = target_lufs;
        self
    }

    /// Set the true-peak ceiling
    #[must_use]
    pub fn with_ceiling_dbtp(mut self, ceiling_dbtp: f64) -> Self {
        self.ceiling_dbtp = ceiling_dbtp;
        self
    }

    /// Set limiter lookahead and release
    #[must_use]
    pub fn with_limiter_timing(mut self, lookahead_ms: f64, release_ms: f64) -> Self {
        self.lookahead_ms = lookahead_ms;
        self.release_ms = release_ms;
        self
    }

    /// Set the output bit depth
    #[must_use]
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Set the dither mode
    #[must_use]
    pub fn with_dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    /// Set the header sample rate
    #[must_use]
    pub fn with_output_sample_rate(mut self, sample_rate: Option<u32>) -> Self {
        self.output_sample_rate = sample_rate;
        self
    }

    /// Set the encoder chunk size
    #[must_use]
    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames;
        self
    }

    /// Ceiling as a linear amplitude (e.g. -1 dBTP -> 0.891)
    pub fn ceiling_linear(&self) -> f64 {
        10.0_f64.powf(self.ceiling_dbtp / 20.0)
    }

    /// Validate ranges
    ///
    /// # Errors
    /// Returns [`CrestError::InvalidConfiguration`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.target_lufs.is_finite() || !TARGET_LUFS_RANGE.contains(&self.target_lufs) {
            return Err(CrestError::invalid_configuration(format!(
                "target loudness {} LUFS is outside {:?}",
                self.target_lufs, TARGET_LUFS_RANGE
            )));
        }
        if !self.ceiling_dbtp.is_finite() || !CEILING_DBTP_RANGE.contains(&self.ceiling_dbtp) {
            return Err(CrestError::invalid_configuration(format!(
                "ceiling {} dBTP is outside {:?}",
                self.ceiling_dbtp, CEILING_DBTP_RANGE
            )));
        }
        if !(self.lookahead_ms.is_finite() && self.lookahead_ms > 0.0) {
            return Err(CrestError::invalid_configuration(format!(
                "lookahead must be positive, got {} ms",
                self.lookahead_ms
            )));
        }
        if !(self.release_ms.is_finite() && self.release_ms > 0.0) {
            return Err(CrestError::invalid_configuration(format!(
                "release must be positive, got {} ms",
                self.release_ms
            )));
        }
        if self.output_sample_rate == Some(0) {
            return Err(CrestError::invalid_configuration(
                "output sample rate must be positive",
            ));
        }
        if self.chunk_frames == 0 {
            return Err(CrestError::invalid_configuration(
                "chunk size must be at least one frame",
            ));
        }
        Ok(())
    }
}
