//! Mixing bus that forwards its summed input.

use crate::error::{check_channels, Result};
use arbor_core::{ProcessContext, ProcessStatus, Processor};

/// Bus processor: output channel `c` carries input channel `c % inputs`, so a
/// mono bus fans out to every output and equal widths copy straight through.
pub struct Passthrough {
    inputs: usize,
    outputs: usize,
}

impl Passthrough {
    pub fn new(inputs: usize, outputs: usize) -> Result<Self> {
        check_channels("passthrough inputs", inputs)?;
        check_channels("passthrough outputs", outputs)?;
        Ok(Self { inputs, outputs })
    }

    pub fn stereo() -> Self {
        Self {
            inputs: 2,
            outputs: 2,
        }
    }
}

impl Processor for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn num_inputs(&self) -> usize {
        self.inputs
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        let Some(input) = ctx.input else {
            return ProcessStatus::Continue;
        };
        let inputs = input.channels();
        if inputs == 0 {
            return ProcessStatus::Continue;
        }
        for (c, out) in ctx.output.iter_channels_mut().enumerate() {
            out.copy_from_slice(input.channel(c % inputs));
        }
        ProcessStatus::Continue
    }
}
