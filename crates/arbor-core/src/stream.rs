//! Real-time master stream and its control-side counterpart.
//!
//! [`MasterStream`] is owned by whoever drives the output callback. Each call
//! to [`MasterStream::process_block`] renders exactly one session block into
//! PCM bytes without allocating, locking or freeing.
//!
//! Topology changes go through [`StreamController::commit`]: the next world
//! is validated and initialized on the control thread, handed over on a
//! bounded channel, swapped in at the start of a block, and the previous
//! world is handed back for disposal.

use crate::buffer::{BufferPool, ChannelBuffer};
use crate::config::SessionConfig;
use crate::error::TopologyError;
use crate::pcm;
use crate::world::{World, WorldHandle};
use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

pub struct MasterStream {
    config: SessionConfig,
    world: Box<World>,
    master: ChannelBuffer,
    pending: Receiver<Box<World>>,
    retired: Sender<Box<World>>,
    /// Holds a retired world if the return channel is full.
    graveyard: Option<Box<World>>,
    running: bool,
    blocks: u64,
}

/// Control-side end of a [`MasterStream`].
pub struct StreamController {
    config: SessionConfig,
    pending: Sender<Box<World>>,
    retired: Receiver<Box<World>>,
}

fn check_world(config: &SessionConfig, world: &World) -> Result<()> {
    if world.num_outputs() != config.num_outputs {
        return Err(TopologyError::OutputMismatch {
            world: world.num_outputs(),
            session: config.num_outputs,
        }
        .into());
    }
    Ok(())
}

impl MasterStream {
    pub fn new(config: SessionConfig, world: World) -> Result<(Self, StreamController)> {
        config.validate()?;
        check_world(&config, &world)?;

        let master = BufferPool::allocate(config.num_outputs, config.block_size)?;
        let (pending_tx, pending_rx) = crossbeam_channel::bounded(1);
        let (retired_tx, retired_rx) = crossbeam_channel::bounded(2);

        let stream = Self {
            config,
            world: Box::new(world),
            master,
            pending: pending_rx,
            retired: retired_tx,
            graveyard: None,
            running: false,
            blocks: 0,
        };
        let controller = StreamController {
            config,
            pending: pending_tx,
            retired: retired_rx,
        };
        Ok((stream, controller))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Only meaningful while stopped; edits take effect at the next start.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Replaces the world directly while stopped. Returns the previous one.
    ///
    /// A committed world that was never picked up is discarded, so it cannot
    /// land over `world` at the next start.
    pub fn replace_world(&mut self, world: World) -> Result<World> {
        if self.running {
            return Err(Error::StreamRunning);
        }
        check_world(&self.config, &world)?;
        while let Ok(mut stale) = self.pending.try_recv() {
            tracing::debug!("discarding uncollected commit");
            stale.teardown();
        }
        let previous = std::mem::replace(&mut *self.world, world);
        Ok(previous)
    }

    /// Picks up a committed world while stopped. Returns true if one was
    /// waiting; the replaced world goes to the retired channel.
    pub fn adopt_pending(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.apply_pending()
    }

    pub fn master_handle(&self) -> WorldHandle {
        self.world.handle()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Blocks rendered since the stream was created.
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks
    }

    /// Initializes the world and begins rendering. Buffers with unchanged
    /// geometry are reused.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.world
            .initialize(self.config.sample_rate as f64, self.config.block_size)?;
        BufferPool::reset(&mut self.master);
        self.running = true;
        tracing::info!(
            sample_rate = self.config.sample_rate,
            block_size = self.config.block_size,
            outputs = self.config.num_outputs,
            "master stream started"
        );
        Ok(())
    }

    /// Halts immediately. No partial block is flushed; buffers stay allocated.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            tracing::info!(blocks = self.blocks, "master stream stopped");
        }
    }

    /// Renders one block into `out` as interleaved s16le and returns the
    /// byte count, `block_size * 2 * num_outputs`.
    ///
    /// Returns 0 after writing silence if the stream is stopped or `out` is
    /// shorter than one block.
    pub fn process_block(&mut self, out: &mut [u8]) -> usize {
        let needed = self.config.bytes_per_block();
        if !self.running || out.len() < needed {
            let n = out.len().min(needed);
            out[..n].fill(0);
            return 0;
        }

        self.apply_pending();
        self.world.render(&mut self.master, self.config.block_size);
        self.blocks += 1;
        pcm::write_interleaved(&self.master, out)
    }

    /// Master bus contents from the last rendered block.
    pub fn master(&self) -> &ChannelBuffer {
        &self.master
    }

    fn apply_pending(&mut self) -> bool {
        match self.pending.try_recv() {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.world, next);
                if let Err(TrySendError::Full(previous) | TrySendError::Disconnected(previous)) =
                    self.retired.try_send(previous)
                {
                    self.graveyard = Some(previous);
                }
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }
}

impl StreamController {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Validates and initializes `world`, then queues it for the audio
    /// thread. Fails with [`Error::CommitPending`] if an earlier world has
    /// not been picked up yet.
    pub fn commit(&self, mut world: World) -> Result<()> {
        check_world(&self.config, &world)?;
        if !self.pending.is_empty() {
            return Err(Error::CommitPending);
        }
        self.collect_retired();
        world.initialize(self.config.sample_rate as f64, self.config.block_size)?;

        match self.pending.try_send(Box::new(world)) {
            Ok(()) => {
                tracing::debug!("world committed");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(Error::CommitPending),
            Err(TrySendError::Disconnected(_)) => Err(Error::StreamStopped),
        }
    }

    /// True while a committed world waits for the next block.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops worlds the audio thread has swapped out. Returns how many.
    pub fn collect_retired(&self) -> usize {
        let mut count = 0;
        while let Ok(mut world) = self.retired.try_recv() {
            world.teardown();
            count += 1;
        }
        if count > 0 {
            tracing::debug!(count, "collected retired worlds");
        }
        count
    }
}
