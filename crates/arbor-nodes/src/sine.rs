//! Sine oscillator source.

use crate::error::{check_channels, Result};
use arbor_core::{ParamCell, ParameterRange, ProcessContext, ProcessStatus, Processor};
use std::f64::consts::TAU;
use std::sync::Arc;

/// Sine wave written identically to every output channel.
pub struct Sine {
    frequency: Arc<ParamCell>,
    amplitude: Arc<ParamCell>,
    outputs: usize,
    phase: f64,
    sample_rate: f64,
}

impl Sine {
    pub fn new(frequency: f64, outputs: usize) -> Result<Self> {
        check_channels("sine", outputs)?;
        let cell = ParamCell::float("frequency", ParameterRange::new(0.0, 20000.0, 440.0));
        cell.set(frequency.into())
            .map_err(|e| crate::Error::InvalidParameter(e.to_string()))?;
        Ok(Self {
            frequency: cell,
            amplitude: ParamCell::float("amplitude", ParameterRange::new(0.0, 1.0, 1.0)),
            outputs,
            phase: 0.0,
            sample_rate: 44100.0,
        })
    }

    pub fn frequency(&self) -> Arc<ParamCell> {
        Arc::clone(&self.frequency)
    }

    pub fn amplitude(&self) -> Arc<ParamCell> {
        Arc::clone(&self.amplitude)
    }
}

impl Processor for Sine {
    fn name(&self) -> &str {
        "sine"
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn setup(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn params(&self) -> Vec<Arc<ParamCell>> {
        vec![self.frequency(), self.amplitude()]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus {
        let increment = self.frequency.get().as_f64().unwrap_or(0.0) / self.sample_rate;
        let amplitude = self.amplitude.get_f32();
        let frames = ctx.frames();
        let start = self.phase;

        for channel in ctx.output.iter_channels_mut() {
            let mut phase = start;
            for sample in channel.iter_mut().take(frames) {
                *sample = (phase * TAU).sin() as f32 * amplitude;
                phase = (phase + increment).fract();
            }
        }
        self.phase = (start + increment * frames as f64).fract();
        ProcessStatus::Continue
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
