//! ArborEngine: owns the session, the master stream and the output backend.

use crate::core::{
    ManualPuller, MasterStream, NodeHandle, NodeId, OutputBackend, SessionConfig,
    StreamController, World, WorldHandle,
};
use crate::{Error, Result};
use parking_lot::Mutex;

/// Main engine. Edit the tree with [`graph`](Self::graph) while stopped,
/// swap a whole new tree in with [`swap_world`](Self::swap_world) at any
/// time, and drive scalar state through [`NodeHandle`]s.
///
/// # Example
///
/// ```
/// use arbor::prelude::*;
///
/// let engine = ArborEngine::builder().block_size(64).build()?;
///
/// let tone = Node::new(Sine::new(440.0, 2)?).with_level(0.5)?;
/// let tone = engine.graph(|world| world.add(tone))??;
///
/// let pcm = engine.render_blocks(4)?;
/// assert_eq!(pcm.len(), 4 * 64 * 2 * 2);
/// tone.set_mute(true);
/// # Ok::<(), arbor::Error>(())
/// ```
pub struct ArborEngine {
    config: SessionConfig,
    controller: StreamController,
    puller: Option<ManualPuller>,
    state: Mutex<EngineState>,
}

struct EngineState {
    /// Present while stopped; owned by the backend while running.
    stream: Option<MasterStream>,
    backend: Box<dyn OutputBackend>,
    master: WorldHandle,
    handles: Vec<NodeHandle>,
    /// Set when the backend failed to hand the stream back.
    lost: bool,
}

impl EngineState {
    fn stream_mut(&mut self) -> Result<&mut MasterStream> {
        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None if self.lost => Err(Error::StreamLost(self.backend.name().to_string())),
            None => Err(arbor_core::Error::StreamRunning.into()),
        }
    }
}

impl ArborEngine {
    pub fn builder() -> crate::ArborEngineBuilder {
        crate::ArborEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: SessionConfig,
        world: World,
        backend: Box<dyn OutputBackend>,
        puller: Option<ManualPuller>,
    ) -> Result<Self> {
        let master = world.handle();
        let handles = world.handles();
        let (stream, controller) = MasterStream::new(config, world)?;
        tracing::debug!(
            backend = backend.name(),
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            outputs = config.num_outputs,
            "engine created"
        );
        Ok(Self {
            config,
            controller,
            puller,
            state: Mutex::new(EngineState {
                stream: Some(stream),
                backend,
                master,
                handles,
                lost: false,
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn num_outputs(&self) -> usize {
        self.config.num_outputs
    }

    /// Bytes produced per block.
    pub fn bytes_per_block(&self) -> usize {
        self.config.bytes_per_block()
    }

    pub fn backend_name(&self) -> String {
        self.state.lock().backend.name().to_string()
    }

    /// Pull side of the default manual backend. `None` when a device backend
    /// was configured.
    pub fn puller(&self) -> Option<ManualPuller> {
        self.puller.clone()
    }

    /// Edits the current world in place. Only allowed while stopped; use
    /// [`swap_world`](Self::swap_world) to change topology while running.
    pub fn graph<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> R,
    {
        let mut state = self.state.lock();
        let stream = state.stream_mut()?;
        let result = f(stream.world_mut());
        let handles = stream.world().handles();
        state.handles = handles;
        Ok(result)
    }

    /// Replaces the whole tree.
    ///
    /// While running, the new world is validated and initialized here and
    /// picked up by the audio thread at the next block boundary. While
    /// stopped it replaces the current world directly.
    pub fn swap_world(&self, world: World) -> Result<()> {
        let master = world.handle();
        let handles = world.handles();

        let mut state = self.state.lock();
        if state.lost {
            return Err(Error::StreamLost(state.backend.name().to_string()));
        }
        match state.stream.as_mut() {
            Some(stream) => {
                let mut previous = stream.replace_world(world)?;
                previous.teardown();
            }
            None => self.controller.commit(world)?,
        }
        state.master = master;
        state.handles = handles;
        Ok(())
    }

    /// Initializes the world and hands the stream to the backend.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.lost {
            return Err(Error::StreamLost(state.backend.name().to_string()));
        }
        let Some(mut stream) = state.stream.take() else {
            return Ok(());
        };

        if let Err(err) = stream.start() {
            state.stream = Some(stream);
            return Err(err.into());
        }
        if let Err(err) = state.backend.open(&self.config) {
            stream.stop();
            state.stream = Some(stream);
            return Err(err.into());
        }
        if let Err(mut stream) = state.backend.attach(stream) {
            stream.stop();
            state.stream = Some(stream);
            return Err(Error::BackendRejected(state.backend.name().to_string()));
        }

        tracing::info!(backend = state.backend.name(), "engine started");
        Ok(())
    }

    /// Takes the stream back from the backend. A world committed but not
    /// yet picked up becomes the current world.
    ///
    /// If the backend cannot return the stream the engine is left in a lost
    /// state: it no longer reports running and refuses further use.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.stream.is_some() || state.lost {
            return Ok(());
        }
        let mut stream = match state.backend.stop() {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(backend = state.backend.name(), %err, "master stream lost");
                state.lost = true;
                return Err(Error::StreamLost(state.backend.name().to_string()));
            }
        };
        if stream.adopt_pending() {
            tracing::debug!("adopted world committed before stop");
        }
        state.stream = Some(stream);
        self.controller.collect_retired();
        tracing::info!("engine stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.stream.is_none() && !state.lost
    }

    /// True once the backend has failed to hand the stream back.
    pub fn is_lost(&self) -> bool {
        self.state.lock().lost
    }

    /// Renders `blocks` blocks offline while stopped and returns the PCM.
    pub fn render_blocks(&self, blocks: usize) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        let stream = state.stream_mut()?;

        let block_bytes = self.config.bytes_per_block();
        let mut out = vec![0u8; blocks * block_bytes];
        stream.start()?;
        for chunk in out.chunks_exact_mut(block_bytes) {
            stream.process_block(chunk);
        }
        stream.stop();
        drop(state);

        self.controller.collect_retired();
        Ok(out)
    }

    /// Master level, mute and active of the current world.
    pub fn master(&self) -> WorldHandle {
        self.state.lock().master.clone()
    }

    /// Handle for any node in the current world.
    pub fn handle(&self, id: NodeId) -> Option<NodeHandle> {
        self.state
            .lock()
            .handles
            .iter()
            .find(|h| h.id() == id)
            .cloned()
    }

    pub fn handles(&self) -> Vec<NodeHandle> {
        self.state.lock().handles.clone()
    }

    /// Delivers events raised on the audio thread to their listeners.
    pub fn dispatch_events(&self) -> usize {
        let handles = self.handles();
        handles.iter().map(NodeHandle::dispatch_events).sum()
    }

    /// Tears down worlds the audio thread has swapped out.
    pub fn collect_retired(&self) -> usize {
        self.controller.collect_retired()
    }

    /// True while a swapped-in world waits for the next block.
    pub fn swap_pending(&self) -> bool {
        self.controller.is_pending()
    }

    #[cfg(feature = "cpal")]
    pub fn list_output_devices() -> Result<Vec<String>> {
        Ok(crate::core::CpalBackend::list_devices()?)
    }
}

impl Drop for ArborEngine {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                tracing::warn!(%err, "failed to stop engine on drop");
            }
        }
    }
}
