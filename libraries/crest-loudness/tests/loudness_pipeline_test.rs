//! Loudness measurement integration tests
//!
//! Exercises the full measurement path (K-weighting, block gating, true
//! peak) through the public API only.
//!
//! ## Reference values
//! - ITU-R BS.1770: a 1 kHz sine at -20 dBFS reads about -23.3 LUFS once the
//!   K-weighting gain at 1 kHz (+0.44 dB) and the mono sine RMS (-3.01 dB)
//!   are accounted for
//! - Silence never passes the -70 LUFS absolute gate

use crest_core::SampleBuffer;
use crest_loudness::{
    integrated_loudness, true_peak_dbtp, LoudnessAnalyzer, LoudnessError, LoudnessMeasurement,
    LoudnessNormalizer,
};
use proptest::prelude::*;
use std::f64::consts::PI;

/// Loudness tolerance for synthetic reference signals
const LUFS_TOLERANCE: f64 = 0.2;

fn sine(sample_rate: u32, frequency: f64, amplitude: f64, secs: f64) -> Vec<f32> {
    let fs = f64::from(sample_rate);
    let frames = (fs * secs) as usize;
    (0..frames)
        .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / fs).sin()) as f32)
        .collect()
}

// =============================================================================
// Gating
// =============================================================================

#[test]
fn all_zero_buffer_measures_minus_infinity() {
    for &(rate, channels) in &[(44_100, 1), (48_000, 2), (96_000, 6)] {
        let buffer = SampleBuffer::silent(rate, channels, rate as usize * 2).unwrap();
        let measurement = integrated_loudness(&buffer).unwrap();

        assert_eq!(measurement, LoudnessMeasurement::Unmeasurable);
        assert_eq!(measurement.lufs(), f64::NEG_INFINITY);
    }
}

#[test]
fn signal_below_absolute_gate_is_unmeasurable() {
    // -90 dBFS is far below the -70 LUFS gate
    let buffer = SampleBuffer::new(48_000, vec![sine(48_000, 1000.0, 3.16e-5, 2.0)]).unwrap();
    assert!(!integrated_loudness(&buffer).unwrap().is_measured());
}

#[test]
fn exactly_one_block_is_measurable() {
    let buffer = SampleBuffer::new(48_000, vec![sine(48_000, 1000.0, 0.1, 0.4)]).unwrap();
    assert!(integrated_loudness(&buffer).unwrap().is_measured());

    let one_short = SampleBuffer::new(48_000, vec![vec![0.1; 19_199]]).unwrap();
    assert_eq!(
        integrated_loudness(&one_short).unwrap(),
        LoudnessMeasurement::InsufficientDuration
    );
}

// =============================================================================
// Reference levels
// =============================================================================

#[test]
fn reference_sine_reads_expected_lufs_at_common_rates() {
    for rate in [44_100, 48_000, 88_200, 96_000] {
        let buffer = SampleBuffer::new(rate, vec![sine(rate, 1000.0, 0.1, 3.0)]).unwrap();
        let lufs = integrated_loudness(&buffer).unwrap().lufs();
        assert!(
            (lufs - (-23.26)).abs() < LUFS_TOLERANCE,
            "{} Hz: got {:.2} LUFS",
            rate,
            lufs
        );
    }
}

#[test]
fn six_db_of_gain_reads_six_lu_louder() {
    let quiet = SampleBuffer::new(48_000, vec![sine(48_000, 440.0, 0.1, 2.0)]).unwrap();
    let loud = quiet.scaled(2.0);

    let a = integrated_loudness(&quiet).unwrap().lufs();
    let b = integrated_loudness(&loud).unwrap().lufs();
    assert!((b - a - 6.0206).abs() < 0.01, "difference {:.3}", b - a);
}

#[test]
fn high_frequencies_weigh_more_than_low() {
    let low = SampleBuffer::new(48_000, vec![sine(48_000, 60.0, 0.1, 2.0)]).unwrap();
    let high = SampleBuffer::new(48_000, vec![sine(48_000, 8000.0, 0.1, 2.0)]).unwrap();

    let low_lufs = integrated_loudness(&low).unwrap().lufs();
    let high_lufs = integrated_loudness(&high).unwrap().lufs();
    assert!(high_lufs > low_lufs + 3.0);
}

#[test]
fn true_peak_is_measured_on_unweighted_signal() {
    // The shelf would lift a 10 kHz tone by ~4 dB if true peak saw the
    // weighted signal
    let buffer = SampleBuffer::new(48_000, vec![sine(48_000, 10_000.0, 0.5, 1.0)]).unwrap();
    let dbtp = true_peak_dbtp(&buffer);
    assert!(dbtp < -5.5 && dbtp > -6.5, "got {:.2} dBTP", dbtp);
}

// =============================================================================
// Report and normalization
// =============================================================================

#[test]
fn analyzer_report_serializes_to_json() {
    let buffer = SampleBuffer::new(44_100, vec![sine(44_100, 1000.0, 0.3, 1.0); 2]).unwrap();
    let report = LoudnessAnalyzer::for_buffer(&buffer)
        .unwrap()
        .analyze(&buffer)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["integrated"]["status"], "measured");
    assert_eq!(json["channels"], 2);
    assert_eq!(json["sample_rate"], 44_100);
}

#[test]
fn unsupported_channel_count_is_an_error() {
    let buffer = SampleBuffer::silent(48_000, 9, 48_000).unwrap();
    assert_eq!(
        integrated_loudness(&buffer).unwrap_err(),
        LoudnessError::InvalidChannelCount(9)
    );
}

#[test]
fn normalization_hits_target_when_peak_allows() {
    let source = SampleBuffer::new(48_000, vec![sine(48_000, 1000.0, 0.02, 3.0); 2]).unwrap();
    let normalizer = LoudnessNormalizer::new(-23.0, -1.0).unwrap();
    let outcome = normalizer.process(source).unwrap();

    assert!(!outcome.report.limited);
    let lufs = integrated_loudness(&outcome.buffer).unwrap().lufs();
    assert!((lufs + 23.0).abs() < 0.05, "got {:.2}", lufs);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: measurement never panics and never yields NaN
    #[test]
    fn loudness_is_never_nan(
        samples in prop::collection::vec(-1.0f32..1.0, 0..30_000)
    ) {
        let buffer = SampleBuffer::new(48_000, vec![samples]).unwrap();
        let measurement = integrated_loudness(&buffer).unwrap();
        prop_assert!(!measurement.lufs().is_nan());
    }

    /// Property: scaling by a gain shifts loudness by the same amount in dB
    #[test]
    fn loudness_follows_gain(
        amplitude in 0.05f64..0.5,
        gain in 0.25f32..2.0,
    ) {
        let source = SampleBuffer::new(48_000, vec![sine(48_000, 997.0, amplitude, 1.0)]).unwrap();
        let before = integrated_loudness(&source).unwrap().lufs();
        let after = integrated_loudness(&source.scaled(gain)).unwrap().lufs();

        let expected = 20.0 * f64::from(gain).log10();
        prop_assert!((after - before - expected).abs() < 0.01);
    }
}
