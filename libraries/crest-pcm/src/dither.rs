//! Triangular-PDF dither source

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// TPDF noise generator producing values in [-1, 1] LSB
///
/// Each value is the sum of two independent uniform draws in [0, 1) minus
/// one, which gives the triangular distribution centred on zero.
#[derive(Debug, Clone)]
pub struct TpdfDither {
    rng: StdRng,
}

impl TpdfDither {
    /// Dither seeded from system entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible dither for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }

    /// Next dither value in LSB
    #[inline]
    pub fn next_value(&mut self) -> f64 {
        self.rng.gen::<f64>() + self.rng.gen::<f64>() - 1.0
    }
}

impl Default for TpdfDither {
    fn default() -> Self {
        Self::new()
    }
}
