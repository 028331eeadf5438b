//! Soft-clipping distortion insert.

use crate::error::{check_channels, Result};
use arbor_core::{ParamCell, ParameterRange, ProcessContext, ProcessStatus, Processor};
use std::sync::Arc;

const MAX_DISTORTION: f64 = 0.99;

/// Waveshaper `y = x (1 + k) / (1 + k |x|)` with `k = 2d / (1 - d)`.
///
/// `distortion = 0` is the identity. Full-scale input always maps to
/// full-scale output; higher settings push quieter samples towards it.
pub struct Sharpen {
    distortion: Arc<ParamCell>,
    channels: usize,
}

impl Sharpen {
    pub fn new(channels: usize) -> Result<Self> {
        check_channels("sharpen", channels)?;
        Ok(Self {
            distortion: ParamCell::float(
                "distortion",
                ParameterRange::new(0.0, MAX_DISTORTION, 0.0),
            ),
            channels,
        })
    }

    pub fn distortion(&self) -> Arc<ParamCell> {
        Arc::clone(&self.distortion)
    }
}

#[inline]
fn shape(x: f32, k: f32) -> f32 {
    x * (1.0 + k) / (1.0 + k * x.abs())
}

impl Processor for Sharpen {
    fn name(&self) -> &str {
        "sharpen"
    }

    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn params(&self) -> Vec<Arc<ParamCell>> {
        vec![self.distortion()]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        let Some(input) = ctx.input else {
            return ProcessStatus::Continue;
        };
        let d = self.distortion.get_f32().clamp(0.0, MAX_DISTORTION as f32);
        let k = 2.0 * d / (1.0 - d);
        for (out, inp) in ctx.output.iter_channels_mut().zip(input.iter_channels()) {
            for (o, &i) in out.iter_mut().zip(inp) {
                *o = shape(i, k);
            }
        }
        ProcessStatus::Continue
    }
}
