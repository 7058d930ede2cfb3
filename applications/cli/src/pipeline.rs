//! End-to-end mastering: normalize, limit, encode

use crate::error::Result;
use crest_core::{MasteringSettings, SampleBuffer};
use crest_loudness::{LoudnessAnalyzer, LoudnessNormalizer, LoudnessReport, NormalizationReport};
use crest_pcm::{encode_wav_async, EncodeOptions};
use serde::Serialize;
use tracing::info;

/// A mastered buffer plus before/after measurements
#[derive(Debug, Clone)]
pub struct MasteredTrack {
    pub buffer: SampleBuffer,
    pub source: LoudnessReport,
    pub normalization: NormalizationReport,
    pub result: LoudnessReport,
}

/// Serializable summary of a master
#[derive(Debug, Clone, Serialize)]
pub struct MasterSummary<'a> {
    pub source: &'a LoudnessReport,
    pub normalization: &'a NormalizationReport,
    pub result: &'a LoudnessReport,
}

impl MasteredTrack {
    pub fn summary(&self) -> MasterSummary<'_> {
        MasterSummary {
            source: &self.source,
            normalization: &self.normalization,
            result: &self.result,
        }
    }
}

/// Analyze a buffer at its own sample rate
pub fn analyze(buffer: &SampleBuffer) -> Result<LoudnessReport> {
    Ok(LoudnessAnalyzer::for_buffer(buffer)?.analyze(buffer)?)
}

/// Normalize and limit `buffer` according to `settings`
pub fn master(buffer: SampleBuffer, settings: &MasteringSettings) -> Result<MasteredTrack> {
    settings.validate()?;

    let source = analyze(&buffer)?;
    let outcome = LoudnessNormalizer::from_settings(settings)?.process(buffer)?;
    let result = analyze(&outcome.buffer)?;

    info!(
        source_lufs = source.integrated_lufs(),
        result_lufs = result.integrated_lufs(),
        result_true_peak_dbtp = result.true_peak_dbtp,
        limited = outcome.report.limited,
        "Mastered buffer"
    );

    Ok(MasteredTrack {
        buffer: outcome.buffer,
        source,
        normalization: outcome.report,
        result,
    })
}

/// Encode a mastered track as WAV bytes
///
/// The header rate is `settings.output_sample_rate` when set, the buffer's
/// own rate otherwise. No resampling happens.
pub async fn encode<P, C>(
    track: &MasteredTrack,
    settings: &MasteringSettings,
    on_progress: P,
    should_cancel: C,
) -> Result<Vec<u8>>
where
    P: FnMut(f64),
    C: FnMut() -> bool,
{
    let rate = settings
        .output_sample_rate
        .unwrap_or_else(|| track.buffer.sample_rate());
    let options = EncodeOptions::from_settings(settings);
    let bytes = encode_wav_async(&track.buffer, rate, &options, on_progress, should_cancel).await?;
    Ok(bytes)
}
