//! Gain insert.

use crate::error::{check_channels, Result};
use arbor_core::{ParamCell, ParameterRange, ProcessContext, ProcessStatus, Processor};
use std::sync::Arc;

/// Scales every channel by the `gain` parameter. Same width in and out, so it
/// fits anywhere in an insert chain of that width.
pub struct Gain {
    gain: Arc<ParamCell>,
    channels: usize,
}

impl Gain {
    pub fn new(channels: usize) -> Result<Self> {
        check_channels("gain", channels)?;
        Ok(Self {
            gain: ParamCell::float("gain", ParameterRange::new(0.0, 16.0, 1.0)),
            channels,
        })
    }

    pub fn gain(&self) -> Arc<ParamCell> {
        Arc::clone(&self.gain)
    }
}

impl Processor for Gain {
    fn name(&self) -> &str {
        "gain"
    }

    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn params(&self) -> Vec<Arc<ParamCell>> {
        vec![self.gain()]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        let Some(input) = ctx.input else {
            return ProcessStatus::Continue;
        };
        let gain = self.gain.get_f32();
        for (out, inp) in ctx.output.iter_channels_mut().zip(input.iter_channels()) {
            for (o, &i) in out.iter_mut().zip(inp) {
                *o = i * gain;
            }
        }
        ProcessStatus::Continue
    }
}
