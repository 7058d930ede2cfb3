//! Float to integer PCM conversion
//!
//! Per sample: clamp to [-1, 1], scale by the largest positive integer of
//! the bit depth, add TPDF dither (16-bit only), round, clamp to the
//! representable range and write little-endian. 24-bit output is never
//! dithered.

use crate::dither::TpdfDither;
use crest_core::{BitDepth, DitherMode, SampleBuffer};
use std::ops::Range;

/// Stateful quantizer for one encode
#[derive(Debug, Clone)]
pub struct Quantizer {
    bit_depth: BitDepth,
    dither: Option<TpdfDither>,
}

impl Quantizer {
    /// Create a quantizer
    ///
    /// `DitherMode::NoiseShaped` is treated as `Tpdf`. `seed` fixes the dither
    /// sequence; `None` seeds from entropy.
    pub fn new(bit_depth: BitDepth, mode: DitherMode, seed: Option<u64>) -> Self {
        let dither = (bit_depth == BitDepth::Sixteen && mode.is_dithered())
            .then(|| TpdfDither::from_seed(seed));
        Self { bit_depth, dither }
    }

    /// Output bit depth
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Whether dither is injected
    pub fn is_dithering(&self) -> bool {
        self.dither.is_some()
    }

    /// Quantize one sample to an integer in the bit depth's range
    #[inline]
    pub fn quantize(&mut self, sample: f32) -> i32 {
        let max = f64::from(self.bit_depth.max_amplitude());
        let min = f64::from(self.bit_depth.min_amplitude());

        let mut scaled = f64::from(sample.clamp(-1.0, 1.0)) * max;
        if let Some(dither) = &mut self.dither {
            scaled += dither.next_value();
        }
        scaled.round().clamp(min, max) as i32
    }

    /// Quantize one sample and append its little-endian bytes
    #[inline]
    pub fn write_sample(&mut self, sample: f32, out: &mut Vec<u8>) {
        let value = self.quantize(sample);
        match self.bit_depth {
            BitDepth::Sixteen => out.extend_from_slice(&(value as i16).to_le_bytes()),
            BitDepth::TwentyFour => out.extend_from_slice(&[
                (value & 0xFF) as u8,
                ((value >> 8) & 0xFF) as u8,
                ((value >> 16) & 0xFF) as u8,
            ]),
        }
    }

    /// Append the interleaved bytes of `frames` from `buffer`
    ///
    /// `frames` is clipped to the buffer length.
    pub fn write_frames(
        &mut self,
        buffer: &SampleBuffer,
        frames: Range<usize>,
        out: &mut Vec<u8>,
    ) {
        let end = frames.end.min(buffer.frames());
        let start = frames.start.min(end);
        let frame_bytes = buffer.channel_count() * self.bit_depth.bytes_per_sample();
        out.reserve((end - start) * frame_bytes);

        for frame in start..end {
            for channel in buffer.channels() {
                self.write_sample(channel[frame], out);
            }
        }
    }
}
