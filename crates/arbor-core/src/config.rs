//! Session configuration.

use crate::buffer::MAX_CHANNELS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Session-wide stream geometry. Set once, pushed down the tree at initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub sample_rate: u32,
    /// Frames per block.
    pub block_size: usize,
    /// Master bus channel count.
    pub num_outputs: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
            num_outputs: 2,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000..=384000).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if !(1..=8192).contains(&self.block_size) {
            return Err(Error::InvalidConfig(format!(
                "block_size {} out of range (1-8192 frames)",
                self.block_size
            )));
        }
        if !(1..=MAX_CHANNELS).contains(&self.num_outputs) {
            return Err(Error::InvalidConfig(format!(
                "num_outputs {} out of range (1-{MAX_CHANNELS})",
                self.num_outputs
            )));
        }
        Ok(())
    }

    /// Bytes produced per block: `block_size * 2 * num_outputs`.
    pub fn bytes_per_block(&self) -> usize {
        crate::pcm::bytes_per_block(self.block_size, self.num_outputs)
    }
}
