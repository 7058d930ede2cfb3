/// End-to-end pipeline tests
/// Writes real WAV files to a temp directory, masters them and reads the result back
use crest_cli::{input, pipeline, resolve_settings, CliError, SettingsOverrides};
use crest_core::{BitDepth, DitherMode, MasteringSettings, TargetPreset};
use crest_loudness::{integrated_loudness, true_peak_dbtp};
use crest_pcm::WavHeader;
use std::path::Path;
use tempfile::TempDir;

/// Write a 16-bit stereo sine to `path`
fn write_sine_wav(path: &Path, sample_rate: u32, amplitude: f32, secs: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * secs) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        let sample = (value * 32_767.0).round() as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Test decoding an integer WAV into a sample buffer
#[test]
fn test_read_wav_decodes_int_pcm() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tone.wav");
    write_sine_wav(&path, 44_100, 0.5, 1.0);

    let buffer = input::read_wav(&path).unwrap();
    assert_eq!(buffer.sample_rate(), 44_100);
    assert_eq!(buffer.channel_count(), 2);
    assert_eq!(buffer.frames(), 44_100);
    assert!((buffer.sample_peak() - 0.5).abs() < 0.001);
}

/// Test decoding failures name the file
#[test]
fn test_read_wav_reports_bad_input() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("not-a-wav.wav");
    std::fs::write(&path, b"definitely not RIFF").unwrap();

    let err = input::read_wav(&path).unwrap_err();
    assert!(matches!(err, CliError::Decode { .. }));
    assert!(err.to_string().contains("not-a-wav.wav"));
}

/// Test the full decode -> master -> encode -> write path
#[tokio::test]
async fn test_master_round_trip_through_files() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("in.wav");
    let output_path = temp_dir.path().join("out.wav");
    write_sine_wav(&input_path, 48_000, 0.05, 3.0);

    let settings = MasteringSettings::from_preset(TargetPreset::AppleMusic)
        .with_bit_depth(BitDepth::TwentyFour);
    let buffer = input::read_wav(&input_path).unwrap();
    let track = pipeline::master(buffer, &settings).unwrap();

    let mut last_progress = 0.0;
    let bytes = pipeline::encode(&track, &settings, |p| last_progress = p, || false)
        .await
        .unwrap();
    input::write_file(&output_path, &bytes).unwrap();
    assert_eq!(last_progress, 1.0);

    let header = WavHeader::parse(&std::fs::read(&output_path).unwrap()).unwrap();
    assert_eq!(header.sample_rate, 48_000);
    assert_eq!(header.bit_depth, BitDepth::TwentyFour);
    assert_eq!(header.channels, 2);

    // Decoding the written file should measure the target loudness
    let decoded = input::read_wav(&output_path).unwrap();
    let lufs = integrated_loudness(&decoded).unwrap().lufs();
    assert!((lufs + 16.0).abs() < 0.1, "got {:.2} LUFS", lufs);
}

/// Test a loud target is held under the ceiling in the written file
#[tokio::test]
async fn test_written_file_respects_ceiling() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("in.wav");
    write_sine_wav(&input_path, 44_100, 0.3, 2.0);

    let settings = MasteringSettings::default()
        .with_target_lufs(-3.0)
        .with_ceiling_dbtp(-1.0)
        .with_bit_depth(BitDepth::TwentyFour)
        .with_dither(DitherMode::None);
    let track = pipeline::master(input::read_wav(&input_path).unwrap(), &settings).unwrap();
    assert!(track.normalization.limited);

    let bytes = pipeline::encode(&track, &settings, |_| {}, || false)
        .await
        .unwrap();
    let output_path = temp_dir.path().join("out.wav");
    input::write_file(&output_path, &bytes).unwrap();

    let decoded = input::read_wav(&output_path).unwrap();
    // 24-bit quantization adds well under 0.01 dB
    assert!(true_peak_dbtp(&decoded) <= -1.0 + 0.01);
}

/// Test cancellation surfaces as a distinguishable error
#[tokio::test]
async fn test_cancelled_encode_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("in.wav");
    write_sine_wav(&input_path, 44_100, 0.2, 1.0);

    let settings = MasteringSettings::default();
    let track = pipeline::master(input::read_wav(&input_path).unwrap(), &settings).unwrap();

    let err = pipeline::encode(&track, &settings, |_| {}, || true)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

/// Test settings file values and command-line overrides layer correctly
#[test]
fn test_settings_file_and_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("crest.toml");
    std::fs::write(
        &path,
        "target_lufs = -23.0\nceiling_dbtp = -2.0\nbit_depth = 24\ndither = \"none\"\n",
    )
    .unwrap();

    let settings = resolve_settings(Some(&path), &SettingsOverrides::default()).unwrap();
    assert_eq!(settings.target_lufs, -23.0);
    assert_eq!(settings.ceiling_dbtp, -2.0);
    assert_eq!(settings.bit_depth, BitDepth::TwentyFour);
    assert_eq!(settings.dither, DitherMode::None);
    // Unset fields keep their defaults
    assert_eq!(settings.release_ms, 50.0);

    let overrides = SettingsOverrides {
        target_lufs: Some(-16.0),
        bit_depth: Some(BitDepth::Sixteen),
        ..Default::default()
    };
    let settings = resolve_settings(Some(&path), &overrides).unwrap();
    assert_eq!(settings.target_lufs, -16.0);
    assert_eq!(settings.ceiling_dbtp, -2.0);
    assert_eq!(settings.bit_depth, BitDepth::Sixteen);
}

/// Test invalid values in the settings file are rejected
#[test]
fn test_settings_file_rejects_bad_bit_depth() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("crest.toml");
    std::fs::write(&path, "bit_depth = 12\n").unwrap();

    let overrides = SettingsOverrides::default();
    assert!(resolve_settings(Some(&path), &overrides).is_err());
}
