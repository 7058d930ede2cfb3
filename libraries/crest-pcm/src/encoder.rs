//! WAV encoding: synchronous, caller-driven chunks, and async
//!
//! All three paths share [`ChunkedEncoder`]. The target sample rate only
//! ends up in the header; the buffer must already be at that rate.

use crate::error::{EncodeError, Result};
use crate::quantizer::Quantizer;
use crate::wav::{WavHeader, HEADER_LEN};
use crest_core::settings::DEFAULT_CHUNK_FRAMES;
use crest_core::{BitDepth, DitherMode, MasteringSettings, SampleBuffer};
use tracing::{debug, info, warn};

/// Options for one encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Output bit depth
    pub bit_depth: BitDepth,
    /// Dither mode (ignored at 24-bit)
    pub dither: DitherMode,
    /// Frames quantized per chunk
    pub chunk_frames: usize,
    /// Fixed dither seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            bit_depth: BitDepth::Sixteen,
            dither: DitherMode::Tpdf,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            seed: None,
        }
    }
}

impl EncodeOptions {
    /// Options for `bit_depth` with default dither and chunking
    pub fn new(bit_depth: BitDepth) -> Self {
        Self {
            bit_depth,
            ..Self::default()
        }
    }

    /// Options from a raw bits-per-sample value
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(Self::new(BitDepth::Sixteen)),
            24 => Ok(Self::new(BitDepth::TwentyFour)),
            other => Err(EncodeError::UnsupportedBitDepth(other)),
        }
    }

    /// Options matching mastering settings
    pub fn from_settings(settings: &MasteringSettings) -> Self {
        Self {
            bit_depth: settings.bit_depth,
            dither: settings.dither,
            chunk_frames: settings.chunk_frames,
            seed: None,
        }
    }

    /// Set the dither mode
    pub fn with_dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    /// Set the chunk size in frames
    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames;
        self
    }

    /// Fix the dither seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Progress after one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Frames encoded so far
    pub frames_done: usize,
    /// Frames in the buffer
    pub frames_total: usize,
}

impl ChunkProgress {
    /// Completed fraction in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 1.0;
        }
        self.frames_done as f64 / self.frames_total as f64
    }

    /// Whether every frame has been encoded
    pub fn is_complete(&self) -> bool {
        self.frames_done >= self.frames_total
    }
}

/// Caller-driven encoder that quantizes one chunk per [`Iterator::next`]
///
/// The bytes are only released by [`finish`](Self::finish) once every chunk
/// has been processed; dropping the encoder early discards them.
///
/// # Example
///
/// ```
/// use crest_core::SampleBuffer;
/// use crest_pcm::{ChunkedEncoder, EncodeOptions};
///
/// let buffer = SampleBuffer::silent(48_000, 2, 10_000).unwrap();
/// let options = EncodeOptions::default().with_chunk_frames(4_096);
/// let mut encoder = ChunkedEncoder::new(&buffer, 48_000, &options).unwrap();
///
/// let steps: Vec<_> = encoder.by_ref().collect();
/// assert_eq!(steps.len(), 3);
/// assert!(steps[2].is_complete());
///
/// let bytes = encoder.finish().unwrap();
/// assert_eq!(bytes.len(), 44 + 10_000 * 2 * 2);
/// ```
#[derive(Debug)]
pub struct ChunkedEncoder<'a> {
    buffer: &'a SampleBuffer,
    header: WavHeader,
    quantizer: Quantizer,
    chunk_frames: usize,
    position: usize,
    bytes: Vec<u8>,
}

impl<'a> ChunkedEncoder<'a> {
    /// Prepare an encode of `buffer` with `target_sample_rate` in the header
    pub fn new(
        buffer: &'a SampleBuffer,
        target_sample_rate: u32,
        options: &EncodeOptions,
    ) -> Result<Self> {
        if options.chunk_frames == 0 {
            return Err(EncodeError::InvalidChunkSize);
        }
        if target_sample_rate != buffer.sample_rate() {
            warn!(
                buffer_rate = buffer.sample_rate(),
                header_rate = target_sample_rate,
                "Header sample rate differs from buffer rate; samples are not resampled"
            );
        }

        let header = WavHeader::new(
            buffer.channel_count(),
            target_sample_rate,
            options.bit_depth,
            buffer.frames(),
        )?;

        let mut bytes = Vec::with_capacity(header.file_len());
        bytes.extend_from_slice(&header.to_bytes());

        debug!(
            frames = buffer.frames(),
            channels = buffer.channel_count(),
            bit_depth = options.bit_depth.bits(),
            dither = options.dither.as_str(),
            "Starting WAV encode"
        );

        Ok(Self {
            buffer,
            header,
            quantizer: Quantizer::new(options.bit_depth, options.dither, options.seed),
            chunk_frames: options.chunk_frames,
            position: 0,
            bytes,
        })
    }

    /// Header that will be written
    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Progress so far
    pub fn progress(&self) -> ChunkProgress {
        ChunkProgress {
            frames_done: self.position,
            frames_total: self.buffer.frames(),
        }
    }

    /// Whether every chunk has been encoded
    pub fn is_finished(&self) -> bool {
        self.position >= self.buffer.frames()
    }

    /// Header plus payload, once every chunk is done
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.is_finished() {
            return Err(EncodeError::Incomplete {
                done: self.position,
                total: self.buffer.frames(),
            });
        }
        debug!(bytes = self.bytes.len(), "Finished WAV encode");
        Ok(self.bytes)
    }
}

impl Iterator for ChunkedEncoder<'_> {
    type Item = ChunkProgress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }

        let end = (self.position + self.chunk_frames).min(self.buffer.frames());
        self.quantizer
            .write_frames(self.buffer, self.position..end, &mut self.bytes);
        self.position = end;

        Some(self.progress())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let frames_left = self.buffer.frames() - self.position;
        let remaining = frames_left.div_ceil(self.chunk_frames);
        (remaining, Some(remaining))
    }
}

/// Encode `buffer` as a complete WAV file in memory
///
/// # Example
///
/// ```
/// use crest_core::{BitDepth, DitherMode, SampleBuffer};
/// use crest_pcm::{encode_wav, EncodeOptions, WavHeader};
///
/// let buffer = SampleBuffer::new(48_000, vec![vec![0.0, 0.25, -0.25, 0.5]]).unwrap();
/// let options = EncodeOptions::new(BitDepth::Sixteen).with_dither(DitherMode::None);
/// let bytes = encode_wav(&buffer, 48_000, &options).unwrap();
///
/// let header = WavHeader::parse(&bytes).unwrap();
/// assert_eq!(header.data_size, 8);
/// ```
pub fn encode_wav(
    buffer: &SampleBuffer,
    target_sample_rate: u32,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    let mut encoder = ChunkedEncoder::new(buffer, target_sample_rate, options)?;
    for _ in encoder.by_ref() {}
    encoder.finish()
}

/// Encode `buffer` in chunks, yielding to the runtime between chunks
///
/// `should_cancel` is polled before every chunk; a `true` aborts with
/// [`EncodeError::Cancelled`] and no bytes. `on_progress` receives the
/// completed fraction after every chunk.
pub async fn encode_wav_async<P, C>(
    buffer: &SampleBuffer,
    target_sample_rate: u32,
    options: &EncodeOptions,
    mut on_progress: P,
    mut should_cancel: C,
) -> Result<Vec<u8>>
where
    P: FnMut(f64),
    C: FnMut() -> bool,
{
    let mut encoder = ChunkedEncoder::new(buffer, target_sample_rate, options)?;
    info!(
        frames = buffer.frames(),
        chunk_frames = options.chunk_frames,
        "Encoding WAV"
    );

    while !encoder.is_finished() {
        if should_cancel() {
            info!(
                frames_done = encoder.progress().frames_done,
                "WAV encode cancelled"
            );
            return Err(EncodeError::Cancelled);
        }

        if let Some(progress) = encoder.next() {
            on_progress(progress.fraction());
        }
        tokio::task::yield_now().await;
    }

    encoder.finish()
}
