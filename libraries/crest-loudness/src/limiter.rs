//! Offline lookahead true-peak limiter
//!
//! Keeps the true peak of a buffer at or below a ceiling by computing a
//! per-sample gain envelope in two passes and applying it once:
//!
//! 1. **Gain computation** - wherever the oversampled peak at a position
//!    exceeds the ceiling, the required gain `ceiling / peak` is written
//!    back over the preceding lookahead span. Gains only ever decrease here.
//! 2. **Release** - walking forward, the held gain snaps down instantly and
//!    relaxes exponentially toward unity otherwise, never rising above
//!    what pass 1 required at that position.
//!
//! A short verification pass then re-measures the limited signal and
//! tightens the envelope locally wherever a gain step inside one
//! interpolation window still lets the curve poke over the ceiling. If a
//! few local passes do not settle it, the whole envelope is scaled down.

use crate::error::{LoudnessError, Result};
use crate::true_peak::{position_peaks, WINDOW_LEN};
use crate::{db_to_linear, linear_to_db};
use crest_core::SampleBuffer;
use std::collections::VecDeque;
use tracing::debug;

/// Default lookahead in milliseconds
pub const DEFAULT_LOOKAHEAD_MS: f64 = 3.0;

/// Default release time constant in milliseconds
pub const DEFAULT_RELEASE_MS: f64 = 50.0;

/// Verification passes after smoothing
const MAX_VERIFY_PASSES: usize = 8;

/// Relative overshoot ignored by verification (f32 output rounding)
const VERIFY_TOLERANCE: f64 = 1e-6;

/// Per-sample linear gain multipliers
///
/// Same length as the frame count of the buffer it was computed for; every
/// value lies in (0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct GainEnvelope {
    gains: Vec<f64>,
}

impl GainEnvelope {
    /// Unity envelope of `frames` samples
    pub fn unity(frames: usize) -> Self {
        Self {
            gains: vec![1.0; frames],
        }
    }

    /// Gains as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.gains
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.gains.len()
    }

    /// Check if the envelope is empty
    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    /// Smallest gain in the envelope (1.0 when empty)
    pub fn min_gain(&self) -> f64 {
        self.gains.iter().copied().fold(1.0, f64::min)
    }

    /// Deepest gain reduction in dB (0 when untouched, negative otherwise)
    pub fn max_reduction_db(&self) -> f64 {
        linear_to_db(self.min_gain())
    }

    /// Whether any position is attenuated
    pub fn is_limiting(&self) -> bool {
        self.gains.iter().any(|&g| g < 1.0)
    }

    /// Multiply every sample of `buffer` by the matching gain
    ///
    /// # Errors
    /// Returns [`LoudnessError::EnvelopeLengthMismatch`] if the envelope was
    /// computed for a buffer of a different length.
    pub fn apply(&self, buffer: &SampleBuffer) -> Result<SampleBuffer> {
        if self.gains.len() != buffer.frames() {
            return Err(LoudnessError::EnvelopeLengthMismatch {
                envelope: self.gains.len(),
                frames: buffer.frames(),
            });
        }
        Ok(self.scale(buffer))
    }

    /// Apply to a buffer already known to match in length
    fn scale(&self, buffer: &SampleBuffer) -> SampleBuffer {
        buffer.map_frames(|i, s| (f64::from(s) * self.gains[i]) as f32)
    }
}

/// Lookahead limiter settings
///
/// # Example
///
/// ```
/// use crest_core::SampleBuffer;
/// use crest_loudness::{true_peak_linear, LookaheadLimiter};
///
/// let hot = SampleBuffer::new(48_000, vec![vec![1.5; 4_800]]).unwrap();
/// let limiter = LookaheadLimiter::from_ceiling_db(-1.0).unwrap();
/// let limited = limiter.process(hot);
/// assert!(true_peak_linear(&limited) <= limiter.ceiling_linear() + 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LookaheadLimiter {
    ceiling: f64,
    lookahead_ms: f64,
    release_ms: f64,
}

impl LookaheadLimiter {
    /// Create a limiter
    ///
    /// # Arguments
    /// * `ceiling` - Linear ceiling (0.891 is about -1 dBTP)
    /// * `lookahead_ms` - How far ahead peaks are anticipated
    /// * `release_ms` - Release time constant
    pub fn new(ceiling: f64, lookahead_ms: f64, release_ms: f64) -> Result<Self> {
        if !(ceiling.is_finite() && ceiling > 0.0) {
            return Err(LoudnessError::InvalidCeiling(ceiling));
        }
        if !(lookahead_ms.is_finite() && lookahead_ms > 0.0) {
            return Err(LoudnessError::InvalidTiming(format!(
                "lookahead must be positive, got {} ms",
                lookahead_ms
            )));
        }
        if !(release_ms.is_finite() && release_ms > 0.0) {
            return Err(LoudnessError::InvalidTiming(format!(
                "release must be positive, got {} ms",
                release_ms
            )));
        }

        Ok(Self {
            ceiling,
            lookahead_ms,
            release_ms,
        })
    }

    /// Limiter with default timing and a ceiling in dBTP
    pub fn from_ceiling_db(ceiling_db: f64) -> Result<Self> {
        if !ceiling_db.is_finite() {
            return Err(LoudnessError::InvalidCeiling(ceiling_db));
        }
        let ceiling = db_to_linear(ceiling_db);
        Self::new(ceiling, DEFAULT_LOOKAHEAD_MS, DEFAULT_RELEASE_MS)
    }

    /// Linear ceiling
    pub fn ceiling_linear(&self) -> f64 {
        self.ceiling
    }

    /// Ceiling in dBTP
    pub fn ceiling_db(&self) -> f64 {
        linear_to_db(self.ceiling)
    }

    /// Lookahead in samples at `sample_rate`
    ///
    /// Never shorter than the interpolation window, so a detected peak's
    /// whole window is attenuated.
    pub fn lookahead_samples(&self, sample_rate: u32) -> usize {
        let samples = self.lookahead_ms * f64::from(sample_rate) / 1000.0;
        (samples.round() as usize).max(WINDOW_LEN - 1)
    }

    /// Per-sample release coefficient at `sample_rate`
    pub fn release_coefficient(&self, sample_rate: u32) -> f64 {
        let release_samples = self.release_ms * f64::from(sample_rate) / 1000.0;
        (-1.0 / release_samples).exp()
    }

    /// Compute the smoothed gain envelope for `buffer`
    pub fn gain_envelope(&self, buffer: &SampleBuffer) -> GainEnvelope {
        let sample_rate = buffer.sample_rate();
        let peaks = position_peaks(buffer);

        let mut envelope = self.lookahead_pass(&peaks, self.lookahead_samples(sample_rate));
        self.release_pass(&mut envelope, self.release_coefficient(sample_rate));
        self.verify_pass(buffer, &mut envelope);

        debug!(
            frames = envelope.len(),
            max_reduction_db = envelope.max_reduction_db(),
            ceiling_db = self.ceiling_db(),
            "Computed limiter gain envelope"
        );
        envelope
    }

    /// Limit `buffer`, returning a new buffer
    pub fn process(&self, buffer: SampleBuffer) -> SampleBuffer {
        self.gain_envelope(&buffer).scale(&buffer)
    }

    /// Pass 1: minimum required gain over each position's lookahead span
    ///
    /// A peak at `i` constrains positions `i - lookahead ..= i`, so position
    /// `j` takes the minimum requirement over `j ..= j + lookahead`. A
    /// monotonic deque keeps this linear in the buffer length.
    fn lookahead_pass(&self, peaks: &[f64], lookahead: usize) -> GainEnvelope {
        let required: Vec<f64> = peaks
            .iter()
            .map(|&peak| {
                if peak > self.ceiling {
                    self.ceiling / peak
                } else {
                    1.0
                }
            })
            .collect();

        let frames = required.len();
        let mut gains = vec![1.0; frames];
        let mut window: VecDeque<usize> = VecDeque::new();

        for i in 0..frames + lookahead {
            if i < frames {
                while matches!(window.back(), Some(&back) if required[back] >= required[i]) {
                    window.pop_back();
                }
                window.push_back(i);
            }

            if i >= lookahead {
                let position = i - lookahead;
                while window.front().is_some_and(|&front| front < position) {
                    window.pop_front();
                }
                if let Some(&front) = window.front() {
                    gains[position] = required[front];
                }
            }
        }

        GainEnvelope { gains }
    }

    /// Pass 2: instant attack, exponential release toward unity
    fn release_pass(&self, envelope: &mut GainEnvelope, coefficient: f64) {
        let mut held = 1.0_f64;
        for gain in &mut envelope.gains {
            if *gain < held {
                held = *gain;
            } else {
                held = (1.0 - (1.0 - held) * coefficient).min(1.0).min(*gain);
            }
            *gain = held;
        }
    }

    /// Re-measure the limited signal and tighten any window still over the ceiling
    fn verify_pass(&self, buffer: &SampleBuffer, envelope: &mut GainEnvelope) {
        let limit = self.ceiling * (1.0 + VERIFY_TOLERANCE);
        for pass in 0..MAX_VERIFY_PASSES {
            let limited = envelope.scale(buffer);
            let mut corrected = 0_usize;

            for (i, &peak) in position_peaks(&limited).iter().enumerate() {
                if peak > limit {
                    let factor = self.ceiling / peak;
                    let start = i.saturating_sub(WINDOW_LEN - 1);
                    for gain in &mut envelope.gains[start..=i] {
                        *gain *= factor;
                    }
                    corrected += 1;
                }
            }

            if corrected == 0 {
                return;
            }
            debug!(pass, corrected, "Tightened limiter envelope");
        }

        // Still over after the local passes: a uniform scale cannot overshoot
        let peak = position_peaks(&envelope.scale(buffer))
            .into_iter()
            .fold(0.0_f64, f64::max);
        if peak > limit {
            let factor = self.ceiling / peak;
            for gain in &mut envelope.gains {
                *gain *= factor;
            }
            debug!(factor, "Scaled whole limiter envelope");
        }
    }
}

impl Default for LookaheadLimiter {
    fn default() -> Self {
        Self {
            ceiling: db_to_linear(-1.0),
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            release_ms: DEFAULT_RELEASE_MS,
        }
    }
}
