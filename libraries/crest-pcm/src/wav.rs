//! Canonical 44-byte PCM WAV header
//!
//! Layout (all integers little-endian):
//!
//! | offset | field                  |
//! |--------|------------------------|
//! | 0      | `RIFF`                 |
//! | 4      | chunk size (36 + data) |
//! | 8      | `WAVE`                 |
//! | 12     | `fmt `                 |
//! | 16     | fmt size = 16          |
//! | 20     | format tag = 1 (PCM)   |
//! | 22     | channels (u16)         |
//! | 24     | sample rate (u32)      |
//! | 28     | byte rate (u32)        |
//! | 32     | block align (u16)      |
//! | 34     | bits per sample (u16)  |
//! | 36     | `data`                 |
//! | 40     | data size (u32)        |

use crate::error::{EncodeError, Result};
use crest_core::BitDepth;

/// Size of the canonical header in bytes
pub const HEADER_LEN: usize = 44;

/// WAVE_FORMAT_PCM
pub const PCM_FORMAT_TAG: u16 = 1;

/// Bytes of the RIFF chunk that precede the payload, excluding the first 8
const RIFF_OVERHEAD: u32 = 36;

/// Fields of a canonical PCM WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Interleaved channel count
    pub channels: u16,
    /// Sample rate written to the header
    pub sample_rate: u32,
    /// Bit depth of the payload
    pub bit_depth: BitDepth,
    /// Payload length in bytes
    pub data_size: u32,
}

impl WavHeader {
    /// Header for `frames` frames of `channels`-channel PCM
    ///
    /// # Errors
    /// Fails for a zero sample rate, zero or too many channels, or a payload
    /// that does not fit the 32-bit RIFF size fields.
    pub fn new(
        channels: usize,
        sample_rate: u32,
        bit_depth: BitDepth,
        frames: usize,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EncodeError::InvalidSampleRate(sample_rate));
        }

        let channel_count = match u16::try_from(channels) {
            Ok(count) if count > 0 => count,
            _ => return Err(EncodeError::TooManyChannels(channels)),
        };
        // Block align is a u16 as well
        let bytes_per_sample = bit_depth.bytes_per_sample() as u16;
        if channel_count.checked_mul(bytes_per_sample).is_none() {
            return Err(EncodeError::TooManyChannels(channels));
        }

        let payload = frames as u64 * channels as u64 * bit_depth.bytes_per_sample() as u64;
        let data_size = u32::try_from(payload)
            .ok()
            .filter(|&size| size <= u32::MAX - RIFF_OVERHEAD)
            .ok_or(EncodeError::PayloadTooLarge(payload))?;

        Ok(Self {
            channels: channel_count,
            sample_rate,
            bit_depth,
            data_size,
        })
    }

    /// Bytes per interleaved frame
    pub fn block_align(&self) -> u16 {
        let bytes_per_sample = self.bit_depth.bytes_per_sample() as u16;
        self.channels.saturating_mul(bytes_per_sample)
    }

    /// Bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        let block_align = u32::from(self.block_align());
        self.sample_rate.saturating_mul(block_align)
    }

    /// Value of the RIFF chunk size field
    pub fn riff_size(&self) -> u32 {
        RIFF_OVERHEAD + self.data_size
    }

    /// Number of frames described by the data size
    pub fn frames(&self) -> usize {
        self.data_size as usize / usize::from(self.block_align())
    }

    /// Total file length, header included
    pub fn file_len(&self) -> usize {
        HEADER_LEN + self.data_size as usize
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0_u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(b"RIFF");
        bytes[4..8].copy_from_slice(&self.riff_size().to_le_bytes());
        bytes[8..12].copy_from_slice(b"WAVE");
        bytes[12..16].copy_from_slice(b"fmt ");
        bytes[16..20].copy_from_slice(&16_u32.to_le_bytes());
        bytes[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
        bytes[22..24].copy_from_slice(&self.channels.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        bytes[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        bytes[34..36].copy_from_slice(&self.bit_depth.bits().to_le_bytes());
        bytes[36..40].copy_from_slice(b"data");
        bytes[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        bytes
    }

    /// Read back a canonical header from the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or_else(|| {
                EncodeError::InvalidHeader(format!(
                    "need {} bytes, got {}",
                    HEADER_LEN,
                    bytes.len()
                ))
            })?;

        for (offset, tag) in [(0, b"RIFF"), (8, b"WAVE"), (12, b"fmt "), (36, b"data")] {
            if &bytes[offset..offset + 4] != tag {
                return Err(EncodeError::InvalidHeader(format!(
                    "expected {:?} at offset {}",
                    String::from_utf8_lossy(tag),
                    offset
                )));
            }
        }

        if read_u32(bytes, 16) != 16 {
            return Err(EncodeError::InvalidHeader("fmt size is not 16".into()));
        }
        let format = read_u16(bytes, 20);
        if format != PCM_FORMAT_TAG {
            return Err(EncodeError::InvalidHeader(format!(
                "format tag {} is not PCM",
                format
            )));
        }

        let bits = read_u16(bytes, 34);
        let bit_depth = match bits {
            16 => BitDepth::Sixteen,
            24 => BitDepth::TwentyFour,
            other => return Err(EncodeError::UnsupportedBitDepth(other)),
        };

        let header = Self {
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            bit_depth,
            data_size: read_u32(bytes, 40),
        };

        if header.channels == 0 {
            return Err(EncodeError::InvalidHeader("zero channels".into()));
        }
        if header.sample_rate == 0 {
            return Err(EncodeError::InvalidSampleRate(0));
        }
        if read_u32(bytes, 4) != header.riff_size()
            || read_u32(bytes, 28) != header.byte_rate()
            || read_u16(bytes, 32) != header.block_align()
        {
            return Err(EncodeError::InvalidHeader(
                "size fields are inconsistent".into(),
            ));
        }

        Ok(header)
    }
}

fn read_u16(bytes: &[u8; HEADER_LEN], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8; HEADER_LEN], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
