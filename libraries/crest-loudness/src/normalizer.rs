//! Loudness normalization to a target level
//!
//! Measures the source, applies the gain needed to reach the target and
//! hands the result to the [`LookaheadLimiter`] only when the projected true
//! peak would exceed the ceiling. The ceiling wins over the target: limited
//! material can end up slightly below the requested loudness.

use crate::analyzer::{integrated_loudness, LoudnessMeasurement};
use crate::error::{LoudnessError, Result};
use crate::limiter::{LookaheadLimiter, DEFAULT_LOOKAHEAD_MS, DEFAULT_RELEASE_MS};
use crate::true_peak::TruePeak;
use crate::{db_to_linear, linear_to_db};
use crest_core::settings::{CEILING_DBTP_RANGE, TARGET_LUFS_RANGE};
use crest_core::{MasteringSettings, SampleBuffer, DEFAULT_CEILING_DBTP};
use serde::Serialize;
use tracing::{debug, info};

/// Why normalization left a buffer untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Every block fell below the gates
    Silent,
    /// Shorter than one analysis block
    InsufficientDuration,
}

impl SkipReason {
    /// Human-readable description
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::InsufficientDuration => "shorter than one 400 ms block",
        }
    }
}

/// What the normalizer measured and did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationReport {
    /// Integrated loudness of the source (`-inf` when unmeasurable)
    pub source_lufs: f64,
    /// True peak of the source in dBTP
    pub source_true_peak_dbtp: f64,
    /// Gain applied before limiting, 0 when skipped
    pub applied_gain_db: f64,
    /// Source true peak plus the applied gain
    pub projected_peak_dbtp: f64,
    /// Whether the limiter ran
    pub limited: bool,
    /// Deepest limiter gain reduction in dB (0 when not limited)
    pub max_reduction_db: f64,
    /// Set when the buffer was returned unchanged
    pub skipped_reason: Option<SkipReason>,
}

impl NormalizationReport {
    /// Whether normalization was skipped
    pub fn is_skipped(&self) -> bool {
        self.skipped_reason.is_some()
    }
}

/// Normalized buffer plus the report describing how it was produced
#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    /// Resulting buffer
    pub buffer: SampleBuffer,
    /// Measurements and decisions
    pub report: NormalizationReport,
}

/// Normalizes buffers to a target integrated loudness
///
/// # Example
///
/// ```
/// use crest_core::SampleBuffer;
/// use crest_loudness::LoudnessNormalizer;
///
/// let normalizer = LoudnessNormalizer::new(-16.0, -1.0).unwrap();
/// let silence = SampleBuffer::silent(44_100, 2, 44_100).unwrap();
///
/// let outcome = normalizer.process(silence.clone()).unwrap();
/// assert!(outcome.report.is_skipped());
/// assert_eq!(outcome.buffer, silence);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessNormalizer {
    target_lufs: f64,
    ceiling_dbtp: f64,
    lookahead_ms: f64,
    release_ms: f64,
}

impl LoudnessNormalizer {
    /// Create a normalizer
    ///
    /// # Arguments
    /// * `target_lufs` - Target integrated loudness, -70 to 0 LUFS
    /// * `ceiling_dbtp` - True-peak ceiling, -20 to 0 dBTP
    pub fn new(target_lufs: f64, ceiling_dbtp: f64) -> Result<Self> {
        if !TARGET_LUFS_RANGE.contains(&target_lufs) {
            return Err(LoudnessError::InvalidTarget(target_lufs));
        }
        if !CEILING_DBTP_RANGE.contains(&ceiling_dbtp) {
            return Err(LoudnessError::InvalidCeiling(ceiling_dbtp));
        }

        Ok(Self {
            target_lufs,
            ceiling_dbtp,
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            release_ms: DEFAULT_RELEASE_MS,
        })
    }

    /// Normalizer configured from mastering settings
    pub fn from_settings(settings: &MasteringSettings) -> Result<Self> {
        Self::new(settings.target_lufs, settings.ceiling_dbtp)?
            .with_limiter_timing(settings.lookahead_ms, settings.release_ms)
    }

    /// Override the limiter lookahead and release times
    pub fn with_limiter_timing(mut self, lookahead_ms: f64, release_ms: f64) -> Result<Self> {
        // Validates the timing without keeping the limiter around
        LookaheadLimiter::new(db_to_linear(self.ceiling_dbtp), lookahead_ms, release_ms)?;
        self.lookahead_ms = lookahead_ms;
        self.release_ms = release_ms;
        Ok(self)
    }

    /// Target loudness in LUFS
    pub fn target_lufs(&self) -> f64 {
        self.target_lufs
    }

    /// Ceiling in dBTP
    pub fn ceiling_dbtp(&self) -> f64 {
        self.ceiling_dbtp
    }

    /// Normalize `buffer`, returning the new buffer and a report
    ///
    /// Silence and buffers shorter than one block are not errors: they come
    /// back unchanged with a [`SkipReason`].
    ///
    /// # Errors
    /// Buffers the analyzer cannot measure at all fail before any gain is
    /// applied: [`LoudnessError::InvalidSampleRate`] outside 8 kHz to 384 kHz
    /// and [`LoudnessError::InvalidChannelCount`] above 8 channels.
    pub fn process(&self, buffer: SampleBuffer) -> Result<NormalizationOutcome> {
        let measurement = integrated_loudness(&buffer)?;
        let source_peak = TruePeak::measure(&buffer);
        let source_true_peak_dbtp = source_peak.dbtp();

        let skip_reason = match measurement {
            LoudnessMeasurement::Measured(lufs) if lufs.is_finite() => None,
            LoudnessMeasurement::InsufficientDuration => Some(SkipReason::InsufficientDuration),
            _ => Some(SkipReason::Silent),
        };
        if let Some(reason) = skip_reason {
            let outcome = Self::skipped(buffer, measurement, source_true_peak_dbtp, reason);
            return Ok(outcome);
        }
        let current_lufs = measurement.lufs();

        let gain_db = self.target_lufs - current_lufs;
        let gained = buffer.scaled(db_to_linear(gain_db) as f32);
        let projected_peak_dbtp = projected_peak_dbtp(source_peak.linear(), gain_db);

        debug!(
            current_lufs,
            target_lufs = self.target_lufs,
            gain_db,
            projected_peak_dbtp,
            ceiling_dbtp = self.ceiling_dbtp,
            "Computed normalization gain"
        );

        let mut report = NormalizationReport {
            source_lufs: current_lufs,
            source_true_peak_dbtp,
            applied_gain_db: gain_db,
            projected_peak_dbtp,
            limited: false,
            max_reduction_db: 0.0,
            skipped_reason: None,
        };

        if projected_peak_dbtp <= self.ceiling_dbtp {
            return Ok(NormalizationOutcome {
                buffer: gained,
                report,
            });
        }

        let limiter = LookaheadLimiter::new(
            db_to_linear(self.ceiling_dbtp),
            self.lookahead_ms,
            self.release_ms,
        )?;
        let envelope = limiter.gain_envelope(&gained);
        let limited = envelope.apply(&gained)?;

        report.limited = true;
        report.max_reduction_db = envelope.max_reduction_db();
        info!(
            projected_peak_dbtp,
            ceiling_dbtp = self.ceiling_dbtp,
            max_reduction_db = report.max_reduction_db,
            "Limiter engaged to hold the ceiling"
        );

        Ok(NormalizationOutcome {
            buffer: limited,
            report,
        })
    }

    /// Normalize `buffer`, discarding the report
    pub fn normalize(&self, buffer: SampleBuffer) -> Result<SampleBuffer> {
        self.process(buffer).map(|outcome| outcome.buffer)
    }

    fn skipped(
        buffer: SampleBuffer,
        measurement: LoudnessMeasurement,
        source_true_peak_dbtp: f64,
        reason: SkipReason,
    ) -> NormalizationOutcome {
        info!(reason = reason.as_str(), "Skipping normalization");
        NormalizationOutcome {
            buffer,
            report: NormalizationReport {
                source_lufs: measurement.lufs(),
                source_true_peak_dbtp,
                applied_gain_db: 0.0,
                projected_peak_dbtp: source_true_peak_dbtp,
                limited: false,
                max_reduction_db: 0.0,
                skipped_reason: Some(reason),
            },
        }
    }
}

impl Default for LoudnessNormalizer {
    fn default() -> Self {
        Self {
            target_lufs: crest_core::STREAMING_REFERENCE_LUFS,
            ceiling_dbtp: DEFAULT_CEILING_DBTP,
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            release_ms: DEFAULT_RELEASE_MS,
        }
    }
}

/// Peak in dBTP that `gain_db` would produce from a source peak, `-inf` for silence
pub fn projected_peak_dbtp(source_peak_linear: f64, gain_db: f64) -> f64 {
    linear_to_db(source_peak_linear) + gain_db
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::true_peak::true_peak_dbtp;

    fn sine(amplitude: f32, secs: f32) -> SampleBuffer {
        let frames = (48_000.0 * secs) as usize;
        let samples = (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48_000.0).sin())
            .collect();
        SampleBuffer::new(48_000, vec![samples]).unwrap()
    }

    #[test]
    fn normalizer_creation() {
        assert!(LoudnessNormalizer::new(-14.0, -1.0).is_ok());
        assert_eq!(
            LoudnessNormalizer::new(5.0, -1.0).unwrap_err(),
            LoudnessError::InvalidTarget(5.0)
        );
        assert_eq!(
            LoudnessNormalizer::new(-14.0, 1.0).unwrap_err(),
            LoudnessError::InvalidCeiling(1.0)
        );
        assert!(LoudnessNormalizer::new(f64::NAN, -1.0).is_err());
        assert!(LoudnessNormalizer::new(-14.0, -1.0)
            .unwrap()
            .with_limiter_timing(0.0, 50.0)
            .is_err());
    }

    #[test]
    fn from_settings_uses_target_and_ceiling() {
        let settings = MasteringSettings::default()
            .with_target_lufs(-23.0)
            .with_ceiling_dbtp(-2.0);
        let normalizer = LoudnessNormalizer::from_settings(&settings).unwrap();
        assert_eq!(normalizer.target_lufs(), -23.0);
        assert_eq!(normalizer.ceiling_dbtp(), -2.0);
    }

    #[test]
    fn quiet_tone_is_raised_to_target_without_limiting() {
        let normalizer = LoudnessNormalizer::new(-20.0, -1.0).unwrap();
        let outcome = normalizer.process(sine(0.05, 2.0)).unwrap();

        assert!(!outcome.report.limited);
        assert!(outcome.report.applied_gain_db > 0.0);
        let lufs = integrated_loudness(&outcome.buffer).unwrap().lufs();
        assert!((lufs + 20.0).abs() < 0.05, "got {}", lufs);
    }

    #[test]
    fn loud_target_engages_limiter() {
        let normalizer = LoudnessNormalizer::new(-3.0, -1.0).unwrap();
        let outcome = normalizer.process(sine(0.25, 2.0)).unwrap();

        assert!(outcome.report.limited);
        assert!(outcome.report.projected_peak_dbtp > -1.0);
        assert!(outcome.report.max_reduction_db < 0.0);
        assert!(true_peak_dbtp(&outcome.buffer) <= -1.0 + 0.01);
    }

    #[test]
    fn short_buffer_is_returned_unchanged() {
        let source = sine(0.5, 0.2);
        let normalizer = LoudnessNormalizer::default();
        let outcome = normalizer.process(source.clone()).unwrap();

        assert_eq!(
            outcome.report.skipped_reason,
            Some(SkipReason::InsufficientDuration)
        );
        assert_eq!(outcome.report.applied_gain_db, 0.0);
        assert_eq!(outcome.buffer, source);
    }

    #[test]
    fn silence_is_returned_unchanged() {
        let source = SampleBuffer::silent(48_000, 2, 48_000).unwrap();
        let normalizer = LoudnessNormalizer::default();
        let outcome = normalizer.process(source.clone()).unwrap();

        assert_eq!(outcome.report.skipped_reason, Some(SkipReason::Silent));
        assert_eq!(outcome.report.source_lufs, f64::NEG_INFINITY);
        assert_eq!(outcome.buffer, source);
    }

    #[test]
    fn unmeasurable_layouts_are_errors_not_skips() {
        let normalizer = LoudnessNormalizer::default();

        let low_rate = SampleBuffer::new(4_000, vec![vec![0.5; 8_000]]).unwrap();
        assert_eq!(
            normalizer.process(low_rate).unwrap_err(),
            LoudnessError::InvalidSampleRate(4_000)
        );

        let wide = SampleBuffer::silent(48_000, 9, 48_000).unwrap();
        assert_eq!(
            normalizer.process(wide).unwrap_err(),
            LoudnessError::InvalidChannelCount(9)
        );
    }

    #[test]
    fn projected_peak_adds_gain() {
        assert!((projected_peak_dbtp(0.5, 6.0) - (-0.0206)).abs() < 1e-3);
        assert_eq!(projected_peak_dbtp(0.0, 6.0), f64::NEG_INFINITY);
    }
}
