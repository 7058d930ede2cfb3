//! Second-order IIR filter stage
//!
//! Coefficients follow the RBJ audio-EQ cookbook and are stored already
//! normalized by `a0`. Filter state lives in a [`Biquad`] that is created
//! fresh for every channel pass, so nothing is shared between channels or
//! between calls.

use std::f64::consts::PI;

/// Normalized biquad coefficients `{b0, b1, b2, a1, a2}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Build from raw cookbook terms, normalizing by `a0`
    ///
    /// A zero `a0` yields all-zero coefficients, i.e. a filter that outputs silence.
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        if a0 == 0.0 || !a0.is_finite() {
            return Self::silence();
        }
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Pass-through filter
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Degenerate all-zero filter
    pub fn silence() -> Self {
        Self {
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// High-shelf filter
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `frequency` - Shelf midpoint in Hz
    /// * `gain_db` - Shelf gain in dB
    /// * `q` - Shelf quality factor
    pub fn high_shelf(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega);
        let a2 = (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha;

        Self::from_raw(b0, b1, b2, a0, a1, a2)
    }

    /// Second-order high-pass filter
    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = (1.0 + cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::from_raw(b0, b1, b2, a0, a1, a2)
    }

    /// Magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, sample_rate: f64, frequency: f64) -> f64 {
        let omega = 2.0 * PI * frequency / sample_rate;
        let (cos1, sin1) = (omega.cos(), omega.sin());
        let (cos2, sin2) = ((2.0 * omega).cos(), (2.0 * omega).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        let num = num_re.hypot(num_im);
        let den = den_re.hypot(den_im);
        20.0 * (num / den).log10()
    }
}

/// One filter instance: coefficients plus the last two inputs and outputs
#[derive(Debug, Clone)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Create a filter starting from silence
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Process one sample
    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        let c = &self.coefficients;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Filter a whole sequence from silence, returning an equal-length output
    pub fn filter(coefficients: BiquadCoefficients, input: &[f64]) -> Vec<f64> {
        let mut stage = Self::new(coefficients);
        input.iter().map(|&x| stage.process_sample(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_signal() {
        let input = [0.5, -0.25, 0.125, 1.0];
        let output = Biquad::filter(BiquadCoefficients::identity(), &input);
        assert_eq!(output, input);
    }

    #[test]
    fn zero_coefficients_yield_silence() {
        let output = Biquad::filter(BiquadCoefficients::silence(), &[1.0, -1.0, 0.5]);
        assert!(output.iter().all(|&y| y == 0.0));

        let degenerate = BiquadCoefficients::from_raw(1.0, 1.0, 1.0, 0.0, 1.0, 1.0);
        assert_eq!(degenerate, BiquadCoefficients::silence());
    }

    #[test]
    fn output_length_matches_input() {
        let coeffs = BiquadCoefficients::high_pass(48_000.0, 100.0, 0.707);
        assert_eq!(Biquad::filter(coeffs, &[0.1; 37]).len(), 37);
        assert!(Biquad::filter(coeffs, &[]).is_empty());
    }

    #[test]
    fn difference_equation_uses_history() {
        let coeffs = BiquadCoefficients {
            b0: 1.0,
            b1: 0.5,
            b2: 0.25,
            a1: -0.5,
            a2: 0.0,
        };
        // y0 = 1
        // y1 = 0.5*1 + 0.5*y0 = 1.0
        // y2 = 0.25*1 + 0.5*y1 = 0.75
        let output = Biquad::filter(coeffs, &[1.0, 0.0, 0.0]);
        assert_eq!(output, vec![1.0, 1.0, 0.75]);
    }

    #[test]
    fn high_pass_blocks_dc() {
        let coeffs = BiquadCoefficients::high_pass(48_000.0, 38.0, 0.5);
        let output = Biquad::filter(coeffs, &vec![1.0; 48_000]);
        assert!(output.last().unwrap().abs() < 1e-3);
        assert!(coeffs.magnitude_db(48_000.0, 1000.0).abs() < 0.1);
    }

    #[test]
    fn high_shelf_reaches_full_gain_at_high_frequencies() {
        let coeffs = BiquadCoefficients::high_shelf(48_000.0, 1500.0, 4.0, 0.707);
        assert!(coeffs.magnitude_db(48_000.0, 50.0).abs() < 0.1);
        assert!((coeffs.magnitude_db(48_000.0, 15_000.0) - 4.0).abs() < 0.2);
    }
}
