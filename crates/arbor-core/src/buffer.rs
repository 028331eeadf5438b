//! Fixed-geometry channel buffers and the mixing primitives over them.

use crate::error::AllocationError;

/// Upper bound on channels per buffer and entries per channel map.
pub const MAX_CHANNELS: usize = 64;

/// Channel-major `channels x frames` sample matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    data: Box<[f32]>,
    channels: usize,
    frames: usize,
}

impl ChannelBuffer {
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    pub fn iter_channels(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.frames.max(1))
    }

    pub fn iter_channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_exact_mut(self.frames.max(1))
    }

    /// Flat channel-major view.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Overwrites this buffer with `src`. Geometries must match.
    pub fn copy_from(&mut self, src: &ChannelBuffer) {
        debug_assert_eq!(self.channels, src.channels);
        debug_assert_eq!(self.frames, src.frames);
        self.data.copy_from_slice(&src.data);
    }

    pub fn has_geometry(&self, channels: usize, frames: usize) -> bool {
        self.channels == channels && self.frames == frames
    }
}

/// Empty placeholder held by uninitialized nodes.
impl Default for ChannelBuffer {
    fn default() -> Self {
        Self {
            data: Box::default(),
            channels: 0,
            frames: 0,
        }
    }
}

/// Stateless allocation and mixing helpers. No other code performs
/// sample-level addition.
pub struct BufferPool;

impl BufferPool {
    /// Zero-initialized buffer. Either dimension being zero is an error.
    pub fn allocate(channels: usize, samples: usize) -> Result<ChannelBuffer, AllocationError> {
        if channels == 0 || samples == 0 {
            return Err(AllocationError { channels, samples });
        }
        Ok(ChannelBuffer {
            data: vec![0.0; channels * samples].into_boxed_slice(),
            channels,
            frames: samples,
        })
    }

    #[inline]
    pub fn reset(buffer: &mut ChannelBuffer) {
        buffer.data.fill(0.0);
    }

    /// `dst[c][s] += src[c][s]` over the channels both buffers share.
    pub fn merge(dst: &mut ChannelBuffer, src: &ChannelBuffer) {
        let channels = dst.channels.min(src.channels);
        for c in 0..channels {
            Self::merge_channel(dst.channel_mut(c), src.channel(c), 1.0);
        }
    }

    /// `dst[s] += src[s] * gain`.
    #[inline]
    pub fn merge_channel(dst: &mut [f32], src: &[f32], gain: f32) {
        if gain == 1.0 {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s;
            }
        } else {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s * gain;
            }
        }
    }

    /// Copies the channels `dst` and `src` share; extra `dst` channels are
    /// cleared.
    pub fn copy_overlap(dst: &mut ChannelBuffer, src: &ChannelBuffer) {
        for (c, out) in dst.iter_channels_mut().enumerate() {
            if c < src.channels {
                out.copy_from_slice(src.channel(c));
            } else {
                out.fill(0.0);
            }
        }
    }

    /// Sums `src` channel `c` into `dst` channel `map(c)`, scaled by `gain`.
    /// Entries naming a channel outside `dst` are skipped.
    pub fn mix_mapped<M>(dst: &mut ChannelBuffer, src: &ChannelBuffer, map: M, gain: f32)
    where
        M: Fn(usize) -> Option<usize>,
    {
        if gain == 0.0 {
            return;
        }
        for c in 0..src.channels {
            let Some(target) = map(c) else { continue };
            if target >= dst.channels {
                continue;
            }
            Self::merge_channel(dst.channel_mut(target), src.channel(c), gain);
        }
    }
}
