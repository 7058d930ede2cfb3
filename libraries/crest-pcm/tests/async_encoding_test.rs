//! Async encoder tests: progress, cancellation and cooperative yielding

use crest_core::{BitDepth, DitherMode, SampleBuffer};
use crest_pcm::{encode_wav, encode_wav_async, EncodeError, EncodeOptions};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn noise_like(frames: usize) -> SampleBuffer {
    let samples = (0..frames)
        .map(|i| ((i * 7_919) % 2_003) as f32 / 2_003.0 - 0.5)
        .collect();
    SampleBuffer::new(48_000, vec![samples]).unwrap()
}

#[tokio::test]
async fn always_cancel_fails_before_any_output() {
    let buffer = noise_like(32_768);
    let progress_calls = AtomicUsize::new(0);

    let result = encode_wav_async(
        &buffer,
        48_000,
        &EncodeOptions::default(),
        |_| {
            progress_calls.fetch_add(1, Ordering::SeqCst);
        },
        || true,
    )
    .await;

    assert!(matches!(result, Err(EncodeError::Cancelled)));
    assert_eq!(progress_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_between_chunks_discards_partial_bytes() {
    let buffer = noise_like(40_000);
    let options = EncodeOptions::default().with_chunk_frames(8_192);
    let polls = AtomicUsize::new(0);

    let result = encode_wav_async(
        &buffer,
        48_000,
        &options,
        |_| {},
        || polls.fetch_add(1, Ordering::SeqCst) >= 2,
    )
    .await;

    assert!(matches!(result, Err(EncodeError::Cancelled)));
    // Polled once per chunk boundary: two chunks ran, the third was refused
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn async_output_matches_sync_output() {
    let buffer = noise_like(100_000);
    let options = EncodeOptions::new(BitDepth::Sixteen)
        .with_dither(DitherMode::None)
        .with_chunk_frames(16_384);

    let mut fractions = Vec::new();
    let bytes = encode_wav_async(&buffer, 48_000, &options, |f| fractions.push(f), || false)
        .await
        .unwrap();

    assert_eq!(bytes, encode_wav(&buffer, 48_000, &options).unwrap());
    assert_eq!(fractions.len(), 7);
    assert_eq!(fractions.last().copied(), Some(1.0));
}

#[tokio::test]
async fn encode_yields_to_other_tasks() {
    let buffer = noise_like(65_536 * 4);
    let options = EncodeOptions::default().with_chunk_frames(4_096);
    let cancel = Arc::new(AtomicBool::new(false));

    // On a current-thread runtime the spawned task can only run if the
    // encoder yields between chunks
    let flag = Arc::clone(&cancel);
    let canceller = tokio::spawn(async move {
        flag.store(true, Ordering::SeqCst);
    });

    let result = encode_wav_async(
        &buffer,
        48_000,
        &options,
        |_| {},
        || cancel.load(Ordering::SeqCst),
    )
    .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(EncodeError::Cancelled)));
}

#[tokio::test]
async fn invalid_options_fail_before_encoding() {
    let buffer = noise_like(1_000);
    let options = EncodeOptions::default().with_chunk_frames(0);

    let result = encode_wav_async(&buffer, 48_000, &options, |_| {}, || false).await;
    assert!(matches!(result, Err(EncodeError::InvalidChunkSize)));

    let result = encode_wav_async(&buffer, 0, &EncodeOptions::default(), |_| {}, || false).await;
    assert!(matches!(result, Err(EncodeError::InvalidSampleRate(0))));
}
