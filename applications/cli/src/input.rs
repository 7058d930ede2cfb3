//! WAV file input and output

use crate::error::{CliError, Result};
use crest_core::SampleBuffer;
use std::path::Path;

/// Decode a WAV file (integer or float PCM) into a sample buffer
pub fn read_wav(path: &Path) -> Result<SampleBuffer> {
    let decode_error = |message: String| CliError::Decode {
        path: path.display().to_string(),
        message,
    };

    let reader = hound::WavReader::open(path).map_err(|e| decode_error(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| decode_error(e.to_string()))?
        }
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        bits = spec.bits_per_sample,
        "Decoded WAV input"
    );

    let buffer = SampleBuffer::from_interleaved(&samples, channels, spec.sample_rate)?;
    Ok(buffer)
}

/// Write encoded bytes to `path`
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    Ok(())
}
