//! DC source.

use crate::error::{check_channels, Result};
use arbor_core::{ParamCell, ParameterRange, ProcessContext, ProcessStatus, Processor};
use std::sync::Arc;

/// Writes the same value to every output sample.
pub struct Constant {
    value: Arc<ParamCell>,
    outputs: usize,
}

impl Constant {
    pub fn new(value: f32, outputs: usize) -> Result<Self> {
        check_channels("constant", outputs)?;
        let cell = ParamCell::float("value", ParameterRange::new(-16.0, 16.0, 0.0));
        cell.set((value as f64).into())
            .map_err(|e| crate::Error::InvalidParameter(e.to_string()))?;
        Ok(Self {
            value: cell,
            outputs,
        })
    }

    pub fn mono(value: f32) -> Result<Self> {
        Self::new(value, 1)
    }

    pub fn value(&self) -> Arc<ParamCell> {
        Arc::clone(&self.value)
    }
}

impl Processor for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn params(&self) -> Vec<Arc<ParamCell>> {
        vec![self.value()]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        ctx.output.as_mut_slice().fill(self.value.get_f32());
        ProcessStatus::Continue
    }
}
