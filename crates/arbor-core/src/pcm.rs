//! Interleaved signed 16-bit little-endian PCM.
//!
//! Conversion is symmetric: `1.0 -> 32767`, `-1.0 -> -32767`. Samples
//! outside `[-1, 1]` are clamped, never wrapped.

use crate::buffer::ChannelBuffer;

pub const BYTES_PER_SAMPLE: usize = 2;

const SCALE: f32 = 32767.0;

#[inline]
pub fn bytes_per_block(frames: usize, channels: usize) -> usize {
    frames * BYTES_PER_SAMPLE * channels
}

#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * SCALE).round() as i16
}

#[inline]
pub fn i16_to_sample(value: i16) -> f32 {
    value as f32 / SCALE
}

/// Writes `buffer` frame by frame into `out`. Returns bytes written, or 0
/// (writing nothing) if `out` is too small.
pub fn write_interleaved(buffer: &ChannelBuffer, out: &mut [u8]) -> usize {
    let channels = buffer.channels();
    let needed = bytes_per_block(buffer.frames(), channels);
    if channels == 0 || out.len() < needed {
        return 0;
    }
    for (frame, chunk) in out[..needed]
        .chunks_exact_mut(BYTES_PER_SAMPLE * channels)
        .enumerate()
    {
        for (c, bytes) in chunk.chunks_exact_mut(BYTES_PER_SAMPLE).enumerate() {
            let value = sample_to_i16(buffer.channel(c)[frame]);
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }
    needed
}

/// Decodes interleaved bytes into per-frame i16 values.
pub fn read_interleaved(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
}
