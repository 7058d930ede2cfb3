//! Integrated loudness analysis
//!
//! This module implements ITU-R BS.1770-style measurement on a fully
//! decoded buffer:
//! - Integrated loudness (LUFS) - 400 ms blocks, 75% overlap, absolute gate
//!   at -70 LUFS and a relative gate 10 dB below the ungated mean
//! - Loudness range (LU) - EBU Tech 3342 style spread of 3 s short-term blocks
//! - True peak (dBTP) and sample peak (dBFS)
//!
//! Silence and buffers too short for a single block are reported as
//! [`LoudnessMeasurement`] variants, never as errors.

use crate::error::{LoudnessError, Result};
use crate::kweighting::KWeighting;
use crate::linear_to_db;
use crate::true_peak::TruePeak;
use crest_core::SampleBuffer;
use serde::Serialize;
use std::fmt;

/// Momentary block duration in seconds
pub const BLOCK_DURATION_SECS: f64 = 0.4;

/// Overlap between consecutive momentary blocks
pub const BLOCK_OVERLAP: f64 = 0.75;

/// Absolute gate as mean-square energy (-70 LUFS)
pub const ABSOLUTE_GATE_MEAN_SQUARE: f64 = 1e-7;

/// Relative gate factor for integrated loudness (-10 dB)
pub const RELATIVE_GATE_FACTOR: f64 = 0.1;

/// BS.1770 loudness offset
pub const LUFS_OFFSET: f64 = -0.691;

/// Short-term window used for loudness range
pub const SHORT_TERM_DURATION_SECS: f64 = 3.0;

/// Hop between short-term windows
pub const SHORT_TERM_HOP_SECS: f64 = 0.1;

/// Relative gate factor for loudness range (-20 dB)
pub const LRA_RELATIVE_GATE_FACTOR: f64 = 0.01;

/// Supported sample rates
const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=384_000;

/// Supported channel counts
const CHANNEL_RANGE: std::ops::RangeInclusive<usize> = 1..=8;

/// Outcome of an integrated loudness measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "lufs", rename_all = "snake_case")]
pub enum LoudnessMeasurement {
    /// Integrated loudness in LUFS
    Measured(f64),
    /// Every block was gated away (silence or near-silence)
    Unmeasurable,
    /// Shorter than one full 400 ms block
    InsufficientDuration,
}

impl LoudnessMeasurement {
    /// Loudness in LUFS, `-inf` when nothing could be measured
    pub fn lufs(&self) -> f64 {
        match self {
            Self::Measured(lufs) => *lufs,
            Self::Unmeasurable | Self::InsufficientDuration => f64::NEG_INFINITY,
        }
    }

    /// Loudness in LUFS, or `fallback` when nothing could be measured
    pub fn lufs_or(&self, fallback: f64) -> f64 {
        match self {
            Self::Measured(lufs) => *lufs,
            Self::Unmeasurable | Self::InsufficientDuration => fallback,
        }
    }

    /// Whether a finite loudness was measured
    pub fn is_measured(&self) -> bool {
        matches!(self, Self::Measured(_))
    }
}

impl fmt::Display for LoudnessMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(lufs) => write!(f, "{:.1} LUFS", lufs),
            Self::Unmeasurable => write!(f, "unmeasurable (silent)"),
            Self::InsufficientDuration => write!(f, "unmeasurable (shorter than 400 ms)"),
        }
    }
}

/// Loudness characteristics of a buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoudnessReport {
    /// Integrated loudness
    pub integrated: LoudnessMeasurement,

    /// Loudness range in LU
    /// Lower values indicate more compressed material
    pub loudness_range_lu: f64,

    /// True peak in dBTP (4x Catmull-Rom oversampling)
    pub true_peak_dbtp: f64,

    /// Sample peak in dBFS
    pub sample_peak_dbfs: f64,

    /// Duration of the analyzed audio in seconds
    pub duration_seconds: f64,

    /// Sample rate of the analyzed audio
    pub sample_rate: u32,

    /// Number of channels
    pub channels: usize,
}

impl LoudnessReport {
    /// Integrated loudness in LUFS (`-inf` when unmeasurable)
    pub fn integrated_lufs(&self) -> f64 {
        self.integrated.lufs()
    }

    /// Check if applying `gain_db` would push the true peak above `ceiling_dbtp`
    pub fn will_exceed_ceiling_at_gain(&self, gain_db: f64, ceiling_dbtp: f64) -> bool {
        self.true_peak_dbtp + gain_db > ceiling_dbtp
    }

    /// Largest gain that keeps the true peak at or below `ceiling_dbtp`
    pub fn max_gain_for_ceiling(&self, ceiling_dbtp: f64) -> f64 {
        ceiling_dbtp - self.true_peak_dbtp
    }
}

impl fmt::Display for LoudnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loudness: {}, Range: {:.1} LU, True Peak: {:.1} dBTP, Sample Peak: {:.1} dBFS",
            self.integrated, self.loudness_range_lu, self.true_peak_dbtp, self.sample_peak_dbfs
        )
    }
}

/// Offline BS.1770 loudness analyzer for one sample rate
///
/// # Example
///
/// ```
/// use crest_core::SampleBuffer;
/// use crest_loudness::{LoudnessAnalyzer, LoudnessMeasurement};
///
/// let analyzer = LoudnessAnalyzer::new(48_000).unwrap();
/// let silence = SampleBuffer::silent(48_000, 2, 48_000).unwrap();
/// assert_eq!(
///     analyzer.integrated_loudness(&silence).unwrap(),
///     LoudnessMeasurement::Unmeasurable
/// );
/// ```
#[derive(Debug, Clone)]
pub struct LoudnessAnalyzer {
    sample_rate: u32,
    k_weighting: KWeighting,
    block_size: usize,
    hop_size: usize,
}

impl LoudnessAnalyzer {
    /// Create an analyzer for `sample_rate` (8000-384000 Hz)
    pub fn new(sample_rate: u32) -> Result<Self> {
        if !SAMPLE_RATE_RANGE.contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }

        let fs = f64::from(sample_rate);
        let block_size = (fs * BLOCK_DURATION_SECS).round() as usize;
        let hop_size = (fs * BLOCK_DURATION_SECS * (1.0 - BLOCK_OVERLAP)).round() as usize;

        Ok(Self {
            sample_rate,
            k_weighting: KWeighting::new(sample_rate),
            block_size,
            hop_size,
        })
    }

    /// Analyzer matching a buffer's sample rate
    pub fn for_buffer(buffer: &SampleBuffer) -> Result<Self> {
        Self::new(buffer.sample_rate())
    }

    /// Sample rate this analyzer was built for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Momentary block length in frames
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Hop between blocks in frames
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Integrated loudness of `buffer`
    pub fn integrated_loudness(&self, buffer: &SampleBuffer) -> Result<LoudnessMeasurement> {
        self.check_buffer(buffer)?;
        if buffer.frames() < self.block_size {
            return Ok(LoudnessMeasurement::InsufficientDuration);
        }

        let weighted = self.k_weighting.apply(buffer);
        Ok(gated_loudness(&block_energies(
            &weighted,
            self.block_size,
            self.hop_size,
        )))
    }

    /// Full loudness report of `buffer`
    pub fn analyze(&self, buffer: &SampleBuffer) -> Result<LoudnessReport> {
        self.check_buffer(buffer)?;

        let (integrated, loudness_range_lu) = if buffer.frames() < self.block_size {
            (LoudnessMeasurement::InsufficientDuration, 0.0)
        } else {
            let weighted = self.k_weighting.apply(buffer);
            let integrated =
                gated_loudness(&block_energies(&weighted, self.block_size, self.hop_size));
            (integrated, self.loudness_range(&weighted))
        };

        Ok(LoudnessReport {
            integrated,
            loudness_range_lu,
            true_peak_dbtp: TruePeak::measure(buffer).dbtp(),
            sample_peak_dbfs: linear_to_db(f64::from(buffer.sample_peak())),
            duration_seconds: buffer.duration_secs(),
            sample_rate: buffer.sample_rate(),
            channels: buffer.channel_count(),
        })
    }

    /// Loudness range over K-weighted channels, 0 when undefined
    fn loudness_range(&self, weighted: &[Vec<f64>]) -> f64 {
        let fs = f64::from(self.sample_rate);
        let window = (fs * SHORT_TERM_DURATION_SECS).round() as usize;
        let hop = (fs * SHORT_TERM_HOP_SECS).round() as usize;

        let energies: Vec<f64> = block_energies(weighted, window, hop)
            .into_iter()
            .filter(|&ms| ms > ABSOLUTE_GATE_MEAN_SQUARE)
            .collect();
        if energies.len() < 2 {
            return 0.0;
        }

        let threshold = mean(&energies) * LRA_RELATIVE_GATE_FACTOR;
        let mut levels: Vec<f64> = energies
            .into_iter()
            .filter(|&ms| ms > threshold)
            .map(mean_square_to_lufs)
            .collect();
        if levels.len() < 2 {
            return 0.0;
        }

        levels.sort_by(f64::total_cmp);
        percentile(&levels, 0.95) - percentile(&levels, 0.10)
    }

    fn check_buffer(&self, buffer: &SampleBuffer) -> Result<()> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(LoudnessError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: buffer.sample_rate(),
            });
        }
        if !CHANNEL_RANGE.contains(&buffer.channel_count()) {
            return Err(LoudnessError::InvalidChannelCount(buffer.channel_count()));
        }
        Ok(())
    }
}

/// Integrated loudness of `buffer` at its own sample rate
pub fn integrated_loudness(buffer: &SampleBuffer) -> Result<LoudnessMeasurement> {
    LoudnessAnalyzer::for_buffer(buffer)?.integrated_loudness(buffer)
}

/// Mean-square energy of every full block, averaged over frames and channels
///
/// Blocks start every `hop` frames; the last block is the final one that
/// still fits entirely inside the signal.
pub fn block_energies(channels: &[Vec<f64>], block: usize, hop: usize) -> Vec<f64> {
    let frames = channels.first().map_or(0, Vec::len);
    if block == 0 || hop == 0 || frames < block || channels.is_empty() {
        return Vec::new();
    }

    let denominator = (block * channels.len()) as f64;
    (0..=frames - block)
        .step_by(hop)
        .map(|start| {
            let sum: f64 = channels
                .iter()
                .map(|channel| {
                    let window = &channel[start..start + block];
                    window.iter().map(|x| x * x).sum::<f64>()
                })
                .sum();
            sum / denominator
        })
        .collect()
}

/// Two-stage gated loudness of a set of block energies
pub fn gated_loudness(energies: &[f64]) -> LoudnessMeasurement {
    let absolute: Vec<f64> = energies
        .iter()
        .copied()
        .filter(|&ms| ms > ABSOLUTE_GATE_MEAN_SQUARE)
        .collect();
    if absolute.is_empty() {
        return LoudnessMeasurement::Unmeasurable;
    }

    let threshold = mean(&absolute) * RELATIVE_GATE_FACTOR;
    let relative: Vec<f64> = absolute.into_iter().filter(|&ms| ms > threshold).collect();
    if relative.is_empty() {
        return LoudnessMeasurement::Unmeasurable;
    }

    LoudnessMeasurement::Measured(mean_square_to_lufs(mean(&relative)))
}

/// Convert mean-square energy to LUFS
pub fn mean_square_to_lufs(mean_square: f64) -> f64 {
    if mean_square <= 0.0 {
        return f64::NEG_INFINITY;
    }
    LUFS_OFFSET + 10.0 * mean_square.log10()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let index = ((sorted.len() - 1) as f64 * fraction).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}
