//! Integer PCM output for Crest
//!
//! This crate provides:
//! - A float to 16/24-bit quantizer with optional TPDF dither
//! - A canonical 44-byte WAV header writer and reader
//! - Synchronous, caller-driven chunked and async (tokio) WAV encoders
//!
//! The encoders never resample: the target sample rate is written to the
//! header only.
//!
//! # Example
//!
//! ```
//! use crest_core::{BitDepth, SampleBuffer};
//! use crest_pcm::{encode_wav, EncodeOptions, WavHeader};
//!
//! let buffer = SampleBuffer::silent(44_100, 2, 44_100).unwrap();
//! let bytes = encode_wav(&buffer, 44_100, &EncodeOptions::new(BitDepth::TwentyFour)).unwrap();
//!
//! let header = WavHeader::parse(&bytes).unwrap();
//! assert_eq!(header.bit_depth, BitDepth::TwentyFour);
//! assert_eq!(bytes.len(), header.file_len());
//! ```

#![deny(unsafe_code)]

pub mod dither;
mod encoder;
mod error;
pub mod quantizer;
pub mod wav;

pub use dither::TpdfDither;
pub use encoder::{encode_wav, encode_wav_async, ChunkProgress, ChunkedEncoder, EncodeOptions};
pub use error::{EncodeError, Result};
pub use quantizer::Quantizer;
pub use wav::{WavHeader, HEADER_LEN};
