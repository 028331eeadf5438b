//! Output backends drive a [`MasterStream`] from a device callback.

use crate::config::SessionConfig;
use crate::stream::MasterStream;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that pulls blocks from a master stream.
///
/// Starting is split in two: `open` prepares the device and may fail without
/// consuming anything; `attach` hands over an already started stream. `stop`
/// hands it back so the caller can edit the tree and restart.
pub trait OutputBackend: Send {
    fn name(&self) -> &str;

    fn open(&mut self, config: &SessionConfig) -> Result<()>;

    /// Gives the stream back if the backend is not open.
    fn attach(&mut self, stream: MasterStream) -> std::result::Result<(), MasterStream>;

    fn stop(&mut self) -> Result<MasterStream>;

    fn is_running(&self) -> bool;
}

type SharedStream = Arc<Mutex<Option<MasterStream>>>;

/// Backend without a device: the caller pulls blocks through a
/// [`ManualPuller`], e.g. from its own callback or an offline loop.
pub struct ManualBackend {
    slot: SharedStream,
    open: bool,
}

/// Pull side of a [`ManualBackend`]. Cloneable and `Send`.
#[derive(Clone)]
pub struct ManualPuller {
    slot: SharedStream,
}

impl ManualBackend {
    pub fn new() -> (Self, ManualPuller) {
        let slot: SharedStream = Arc::new(Mutex::new(None));
        let backend = Self {
            slot: slot.clone(),
            open: false,
        };
        (backend, ManualPuller { slot })
    }
}

impl OutputBackend for ManualBackend {
    fn name(&self) -> &str {
        "manual"
    }

    fn open(&mut self, _config: &SessionConfig) -> Result<()> {
        if self.slot.lock().is_some() {
            return Err(Error::StreamRunning);
        }
        self.open = true;
        Ok(())
    }

    fn attach(&mut self, stream: MasterStream) -> std::result::Result<(), MasterStream> {
        let mut slot = self.slot.lock();
        if !self.open || slot.is_some() {
            return Err(stream);
        }
        *slot = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<MasterStream> {
        let mut stream = self.slot.lock().take().ok_or(Error::StreamStopped)?;
        self.open = false;
        stream.stop();
        Ok(stream)
    }

    fn is_running(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl ManualPuller {
    /// Renders one block. Never blocks: if the backend is being started or
    /// stopped at this moment, or is not running, writes silence and
    /// returns 0.
    pub fn pull(&self, out: &mut [u8]) -> usize {
        let Some(mut slot) = self.slot.try_lock() else {
            out.fill(0);
            return 0;
        };
        match slot.as_mut() {
            Some(stream) => stream.process_block(out),
            None => {
                out.fill(0);
                0
            }
        }
    }

    /// `blocks` consecutive blocks of `block_bytes` each.
    pub fn pull_blocks(&self, blocks: usize, block_bytes: usize) -> Vec<u8> {
        let mut out = vec![0u8; blocks * block_bytes];
        for chunk in out.chunks_exact_mut(block_bytes.max(1)) {
            self.pull(chunk);
        }
        out
    }
}
