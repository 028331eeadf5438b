//! One-shot sample player.
//!
//! Plays an in-memory interleaved buffer once. The block that reaches the
//! end is zero-filled past the last frame and reports end of content; the
//! tree then deactivates the node. Reactivating plays it from the start.

use crate::error::{check_channels, Error, Result};
use arbor_core::{ProcessContext, ProcessStatus, Processor};
use std::sync::Arc;

pub struct OneShot {
    samples: Arc<[f32]>,
    channels: usize,
    position: usize,
}

impl OneShot {
    /// `samples` is interleaved with `channels` samples per frame.
    pub fn new(samples: impl Into<Arc<[f32]>>, channels: usize) -> Result<Self> {
        check_channels("oneshot", channels)?;
        let samples = samples.into();
        if samples.len() % channels != 0 {
            return Err(Error::InvalidSampleData(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        Ok(Self {
            samples,
            channels,
            position: 0,
        })
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Current playback position in frames.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Processor for OneShot {
    fn name(&self) -> &str {
        "oneshot"
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        let frames = ctx.frames();
        let available = self.len().saturating_sub(self.position);
        let count = frames.min(available);
        let start = self.position * self.channels;

        for (c, channel) in ctx.output.iter_channels_mut().enumerate() {
            let src = c % self.channels;
            for (i, sample) in channel.iter_mut().enumerate() {
                *sample = if i < count {
                    self.samples[start + i * self.channels + src]
                } else {
                    0.0
                };
            }
        }

        self.position += count;
        if count < frames || self.position >= self.len() {
            self.position = 0;
            return ProcessStatus::EndOfContent;
        }
        ProcessStatus::Continue
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn retrigger_on_activate(&self) -> bool {
        true
    }
}
