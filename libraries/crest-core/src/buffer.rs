/// Audio buffer types
use crate::error::{CrestError, Result};

/// Fully decoded multi-channel audio
///
/// Samples are stored planar (one `Vec<f32>` per channel) in the nominal
/// range [-1.0, 1.0]. Values outside that range are allowed and count as
/// clipped. Every processing stage treats a buffer as a value: it takes one
/// and returns a freshly allocated successor.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Create a buffer from planar channel data
    ///
    /// # Errors
    /// Returns [`CrestError::InvalidBuffer`] if the sample rate is zero, there
    /// are no channels, or the channels differ in length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CrestError::invalid_buffer("sample rate must be positive"));
        }
        if channels.is_empty() {
            return Err(CrestError::invalid_buffer("buffer has no channels"));
        }

        let frames = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frames)
        {
            return Err(CrestError::invalid_buffer(format!(
                "channel {} has {} frames, expected {}",
                index,
                channel.len(),
                frames
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Create a buffer of digital silence
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count])
    }

    /// Create a buffer from interleaved samples (`L R L R ...` for stereo)
    ///
    /// # Errors
    /// Returns an error if `channel_count` is zero or the sample count is not
    /// divisible by it.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if channel_count == 0 {
            return Err(CrestError::invalid_buffer("channel count is zero"));
        }
        if samples.len() % channel_count != 0 {
            return Err(CrestError::invalid_buffer(format!(
                "sample count {} is not divisible by channel count {}",
                samples.len(),
                channel_count
            )));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    /// Interleave the channels (`L R L R ...` for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for frame in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index >= channel_count()`.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// All channels, planar
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Consume the buffer and return its planar channel data
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Produce a new buffer by applying `f` to every sample
    pub fn map_samples(&self, mut f: impl FnMut(f32) -> f32) -> Self {
        self.map_frames(|_, s| f(s))
    }

    /// Produce a new buffer by applying `f(frame_index, sample)` to every sample
    pub fn map_frames(&self, mut f: impl FnMut(usize, f32) -> f32) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|channel| channel.iter().enumerate().map(|(i, &s)| f(i, s)).collect())
                .collect(),
        }
    }

    /// Produce a new buffer with every sample multiplied by a linear gain
    pub fn scaled(&self, gain: f32) -> Self {
        self.map_samples(|s| s * gain)
    }

    /// Largest absolute sample value across all channels
    pub fn sample_peak(&self) -> f32 {
        self.channels
            .iter()
            .flatten()
            .fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}
