//! K-weighting pre-filter
//!
//! A high-shelf stage modelling the acoustic effect of the head, followed by
//! a high-pass stage that removes rumble and DC. Measurement runs on the
//! filtered copy; the unfiltered buffer is kept for true-peak metering.

use crate::biquad::{Biquad, BiquadCoefficients};
use crest_core::SampleBuffer;

/// Shelf midpoint (Hz)
pub const SHELF_FREQUENCY_HZ: f64 = 1681.974450955533;
/// Shelf gain (dB)
pub const SHELF_GAIN_DB: f64 = 3.999843853973347;
/// Shelf quality factor
pub const SHELF_Q: f64 = 0.7071752369554196;
/// High-pass corner (Hz)
pub const HIGH_PASS_FREQUENCY_HZ: f64 = 38.13547087602444;
/// High-pass quality factor
pub const HIGH_PASS_Q: f64 = 0.5003270373238773;

/// K-weighting cascade for one sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KWeighting {
    shelf: BiquadCoefficients,
    high_pass: BiquadCoefficients,
}

impl KWeighting {
    /// Derive both stages for `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        let fs = f64::from(sample_rate);
        Self {
            shelf: BiquadCoefficients::high_shelf(fs, SHELF_FREQUENCY_HZ, SHELF_GAIN_DB, SHELF_Q),
            high_pass: BiquadCoefficients::high_pass(fs, HIGH_PASS_FREQUENCY_HZ, HIGH_PASS_Q),
        }
    }

    /// Filter one channel: shelf, then high-pass, each from silence
    pub fn filter_channel(&self, samples: &[f32]) -> Vec<f64> {
        let mut shelf = Biquad::new(self.shelf);
        let mut high_pass = Biquad::new(self.high_pass);
        samples
            .iter()
            .map(|&s| high_pass.process_sample(shelf.process_sample(f64::from(s))))
            .collect()
    }

    /// Filtered planar copy of every channel
    pub fn apply(&self, buffer: &SampleBuffer) -> Vec<Vec<f64>> {
        buffer
            .channels()
            .iter()
            .map(|channel| self.filter_channel(channel))
            .collect()
    }

    /// Combined magnitude response in dB
    pub fn magnitude_db(&self, sample_rate: u32, frequency: f64) -> f64 {
        let fs = f64::from(sample_rate);
        self.shelf.magnitude_db(fs, frequency) + self.high_pass.magnitude_db(fs, frequency)
    }
}
