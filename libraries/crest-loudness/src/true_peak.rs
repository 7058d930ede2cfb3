//! True-peak estimation
//!
//! Each channel is oversampled 4x with a local Catmull-Rom cubic through a
//! sliding window of four unfiltered samples `[y0, y1, y2, y3]`. The curve
//! is evaluated at t = 0.25, 0.5 and 0.75 between `y1` and `y2`; together
//! with the raw sample this gives the peak seen at each sample position.
//! The limiter reuses [`position_peaks`] so that it enforces the ceiling with
//! exactly the measure used to verify it.

use crate::linear_to_db;
use crest_core::SampleBuffer;

/// Fractional positions evaluated between the two middle window samples
pub const OVERSAMPLE_POSITIONS: [f64; 3] = [0.25, 0.5, 0.75];

/// Window length of the interpolator
pub const WINDOW_LEN: usize = 4;

/// Catmull-Rom cubic through `y0..y3`, evaluated between `y1` (t = 0) and `y2` (t = 1)
#[inline]
pub fn catmull_rom(y0: f64, y1: f64, y2: f64, y3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * y1)
        + (y2 - y0) * t
        + (2.0 * y0 - 5.0 * y1 + 4.0 * y2 - y3) * t2
        + (3.0 * y1 - y0 - 3.0 * y2 + y3) * t3)
}

/// Sliding four-sample window for one channel
#[derive(Debug, Clone, Default)]
pub struct TruePeakWindow {
    history: [f64; WINDOW_LEN],
    seen: usize,
}

impl TruePeakWindow {
    /// Empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift in a sample and return the peak magnitude observed at this position
    ///
    /// The raw sample always counts; the interpolated points are included
    /// once four samples have been seen.
    #[inline]
    pub fn push(&mut self, sample: f64) -> f64 {
        self.history.rotate_left(1);
        self.history[WINDOW_LEN - 1] = sample;
        self.seen = self.seen.saturating_add(1);

        let mut peak = sample.abs();
        if self.seen >= WINDOW_LEN {
            let [y0, y1, y2, y3] = self.history;
            for &t in &OVERSAMPLE_POSITIONS {
                peak = peak.max(catmull_rom(y0, y1, y2, y3, t).abs());
            }
        }
        peak
    }
}

/// Per-position peak magnitudes, maximum across all channels
pub fn position_peaks(buffer: &SampleBuffer) -> Vec<f64> {
    let mut peaks = vec![0.0_f64; buffer.frames()];
    for channel in buffer.channels() {
        let mut window = TruePeakWindow::new();
        for (peak, &sample) in peaks.iter_mut().zip(channel) {
            *peak = peak.max(window.push(f64::from(sample)));
        }
    }
    peaks
}

/// Linear true peak of one channel
pub fn channel_true_peak(samples: &[f32]) -> f64 {
    let mut window = TruePeakWindow::new();
    samples
        .iter()
        .fold(0.0_f64, |peak, &s| peak.max(window.push(f64::from(s))))
}

/// True-peak measurement of a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct TruePeak {
    /// Linear peak per channel
    pub per_channel: Vec<f64>,
}

impl TruePeak {
    /// Measure every channel of `buffer`
    pub fn measure(buffer: &SampleBuffer) -> Self {
        Self {
            per_channel: buffer
                .channels()
                .iter()
                .map(|channel| channel_true_peak(channel))
                .collect(),
        }
    }

    /// Largest linear peak across channels
    pub fn linear(&self) -> f64 {
        self.per_channel.iter().copied().fold(0.0, f64::max)
    }

    /// Peak in dBTP, `-inf` for digital silence
    pub fn dbtp(&self) -> f64 {
        linear_to_db(self.linear())
    }
}

/// Linear true peak across all channels
pub fn true_peak_linear(buffer: &SampleBuffer) -> f64 {
    TruePeak::measure(buffer).linear()
}

/// True peak in dBTP across all channels (`-inf` for silence)
pub fn true_peak_dbtp(buffer: &SampleBuffer) -> f64 {
    TruePeak::measure(buffer).dbtp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catmull_rom_passes_through_inner_points() {
        assert_eq!(catmull_rom(0.3, 0.5, -0.2, 0.9, 0.0), 0.5);
        assert!((catmull_rom(0.3, 0.5, -0.2, 0.9, 1.0) + 0.2).abs() < 1e-12);
        // Linear data stays linear
        assert!((catmull_rom(0.0, 1.0, 2.0, 3.0, 0.5) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn silence_is_minus_infinity() {
        let buffer = SampleBuffer::silent(48_000, 2, 1024).unwrap();
        assert_eq!(true_peak_linear(&buffer), 0.0);
        assert_eq!(true_peak_dbtp(&buffer), f64::NEG_INFINITY);
    }

    #[test]
    fn detects_inter_sample_peak() {
        // Alternating pattern with a symmetric pair: the curve between the
        // two 0.8 samples overshoots the sample peak.
        let samples = [0.0, -0.4, 0.8, 0.8, -0.4, 0.0];
        let buffer = SampleBuffer::new(48_000, vec![samples.to_vec()]).unwrap();

        let sample_peak = f64::from(buffer.sample_peak());
        let true_peak = true_peak_linear(&buffer);
        assert!(true_peak > sample_peak, "{} <= {}", true_peak, sample_peak);
    }

    #[test]
    fn short_channels_still_count_raw_samples() {
        let buffer = SampleBuffer::new(48_000, vec![vec![0.0, -0.5]]).unwrap();
        assert_eq!(true_peak_linear(&buffer), 0.5);
    }

    #[test]
    fn global_peak_is_max_over_channels() {
        let left = vec![0.1, 0.2, 0.1, 0.0];
        let right = vec![0.0, -0.5, 0.0, 0.0];
        let buffer = SampleBuffer::new(48_000, vec![left, right]).unwrap();
        let peak = TruePeak::measure(&buffer);
        assert_eq!(peak.per_channel.len(), 2);
        assert!(peak.per_channel[1] >= 0.5);
        assert_eq!(peak.linear(), peak.per_channel[1]);

        let positions = position_peaks(&buffer);
        assert_eq!(positions.len(), 4);
        let loudest = positions.iter().copied().fold(0.0, f64::max);
        assert!((loudest - peak.linear()).abs() < 1e-12);
    }

    #[test]
    fn full_scale_sine_reads_near_zero_dbtp() {
        let samples: Vec<f32> = (0..4800)
            .map(|i| (2.0 * std::f64::consts::PI * 997.0 * i as f64 / 48_000.0).sin() as f32)
            .collect();
        let buffer = SampleBuffer::new(48_000, vec![samples]).unwrap();
        let dbtp = true_peak_dbtp(&buffer);
        assert!(dbtp > -0.1 && dbtp < 0.1, "got {}", dbtp);
    }
}
