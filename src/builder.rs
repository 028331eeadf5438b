//! Builder for configuring and constructing an `ArborEngine`.

use crate::core::{ManualBackend, OutputBackend, SessionConfig, World};
use crate::{ArborEngine, Result};

/// Without an explicit backend the engine renders through a
/// [`ManualBackend`]; its puller is available from
/// [`ArborEngine::puller`].
///
/// # Example
///
/// ```
/// use arbor::prelude::*;
///
/// let engine = ArborEngine::builder()
///     .sample_rate(48000)
///     .block_size(256)
///     .outputs(2)
///     .build()?;
///
/// assert_eq!(engine.sample_rate(), 48000);
/// # Ok::<(), arbor::Error>(())
/// ```
pub struct ArborEngineBuilder {
    config: SessionConfig,
    backend: Option<Box<dyn OutputBackend>>,

    #[cfg(feature = "cpal")]
    output_device: Option<usize>,
}

impl Default for ArborEngineBuilder {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            backend: None,

            #[cfg(feature = "cpal")]
            output_device: None,
        }
    }
}

impl ArborEngineBuilder {
    /// Default: 44100
    pub fn sample_rate(mut self, hz: u32) -> Self {
        self.config.sample_rate = hz;
        self
    }

    /// Frames per block. Default: 512
    pub fn block_size(mut self, frames: usize) -> Self {
        self.config.block_size = frames;
        self
    }

    /// Default: 2
    pub fn outputs(mut self, count: usize) -> Self {
        self.config.num_outputs = count;
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: impl OutputBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Play through a CPAL output device (`None` for the system default).
    #[cfg(feature = "cpal")]
    pub fn output_device(mut self, index: Option<usize>) -> Self {
        self.output_device = index;
        self.backend = Some(Box::new(crate::core::CpalBackend::new(index)));
        self
    }

    pub fn build(self) -> Result<ArborEngine> {
        self.config.validate()?;

        let (backend, puller): (Box<dyn OutputBackend>, _) = match self.backend {
            Some(backend) => (backend, None),
            None => {
                let (backend, puller) = ManualBackend::new();
                (Box::new(backend), Some(puller))
            }
        };

        #[cfg(feature = "cpal")]
        if let Some(index) = self.output_device {
            tracing::debug!(device = index, "using cpal output device");
        }

        let world = World::new(self.config.num_outputs);
        ArborEngine::from_parts(self.config, world, backend, puller)
    }
}
