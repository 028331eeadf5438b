//! Test helpers and fixtures for arbor integration tests
//!
//! Engines built here use the manual backend, so no audio hardware is
//! touched and every block is rendered deterministically on the test thread.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (oscillators, waveshapers)
//! - `INT16_EPSILON`: one step of the 16-bit output

#![allow(dead_code)]


use arbor::core::pcm;
use arbor::prelude::*;

pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Small blocks keep expected buffers readable.
pub const TEST_BLOCK_SIZE: usize = 4;

/// Routes engine logs to the test output. Set `RUST_LOG=arbor_core=debug`
/// to see tree initialization.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stereo engine with the manual backend.
pub fn test_engine() -> ArborEngine {
    test_engine_with(2, TEST_BLOCK_SIZE)
}

pub fn test_engine_with(outputs: usize, block_size: usize) -> ArborEngine {
    init_tracing();
    ArborEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(block_size)
        .outputs(outputs)
        .build()
        .expect("Failed to create test engine")
}

/// Decode interleaved s16le bytes to floats.
pub fn decode(bytes: &[u8]) -> Vec<f32> {
    pcm::read_interleaved(bytes).map(pcm::i16_to_sample).collect()
}

/// Decode interleaved s16le bytes to raw sample values.
pub fn decode_i16(bytes: &[u8]) -> Vec<i16> {
    pcm::read_interleaved(bytes).collect()
}

/// One channel out of an interleaved float signal.
pub fn channel(interleaved: &[f32], channels: usize, index: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(index)
        .step_by(channels)
        .copied()
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Assert every sample equals `expected` within `epsilon`.
pub fn assert_all_near(samples: &[f32], expected: f32, epsilon: f32) {
    for (i, &s) in samples.iter().enumerate() {
        assert!(
            (s - expected).abs() <= epsilon,
            "Sample {} was {}, expected {} (diff={})",
            i,
            s,
            expected,
            (s - expected).abs()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_split() {
        let interleaved = [1.0, -1.0, 2.0, -2.0];
        assert_eq!(channel(&interleaved, 2, 0), vec![1.0, 2.0]);
        assert_eq!(channel(&interleaved, 2, 1), vec![-1.0, -2.0]);
    }

    #[test]
    fn test_rms_calculation() {
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
