//! The root of the tree: top-level nodes feeding the master bus.

use crate::buffer::{BufferPool, ChannelBuffer, MAX_CHANNELS};
use crate::error::{ParameterError, TopologyError};
use crate::lockfree::{AtomicFlag, AtomicFloat};
use crate::node::{NodeHandle, NodeId, ParentLink};
use crate::tree::Node;
use crate::Result;
use std::sync::Arc;

#[derive(Debug)]
struct WorldControls {
    level: AtomicFloat,
    mute: AtomicFlag,
    active: AtomicFlag,
}

/// Master controls applied to everything the world renders.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    controls: Arc<WorldControls>,
}

impl WorldHandle {
    pub fn level(&self) -> f32 {
        self.controls.level.get()
    }

    pub fn set_level(&self, level: f32) -> std::result::Result<(), ParameterError> {
        if !level.is_finite() {
            return Err(ParameterError::OutOfRange {
                name: "level".into(),
                value: level as f64,
                min: f32::MIN as f64,
                max: f32::MAX as f64,
            });
        }
        self.controls.level.set(level);
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.controls.mute.get()
    }

    /// Nodes keep processing; the master bus renders silence.
    pub fn set_mute(&self, mute: bool) {
        self.controls.mute.set(mute);
    }

    pub fn is_active(&self) -> bool {
        self.controls.active.get()
    }

    /// An inactive world renders silence without processing any node.
    pub fn set_active(&self, active: bool) {
        self.controls.active.set(active);
    }
}

/// Top-level nodes of a session, mixed into a `num_outputs`-wide master bus.
pub struct World {
    nodes: Vec<Node>,
    num_outputs: usize,
    controls: Arc<WorldControls>,
}

impl World {
    pub fn new(num_outputs: usize) -> Self {
        Self {
            nodes: Vec::new(),
            num_outputs: num_outputs.min(MAX_CHANNELS),
            controls: Arc::new(WorldControls {
                level: AtomicFloat::new(1.0),
                mute: AtomicFlag::new(false),
                active: AtomicFlag::new(true),
            }),
        }
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn handle(&self) -> WorldHandle {
        WorldHandle {
            controls: Arc::clone(&self.controls),
        }
    }

    /// Adds a top-level node. Its channel map must target master channels.
    pub fn add(&mut self, node: Node) -> std::result::Result<NodeHandle, TopologyError> {
        let link = ParentLink::World {
            outputs: self.num_outputs,
        };
        if let Err(err) = node.controls().validate_map(Some(self.num_outputs)) {
            tracing::warn!(node = %node.id(), %err, "rejected top-level node");
            return Err(err);
        }
        *node.controls().parent.lock() = Some(link);
        let handle = node.handle();
        self.nodes.push(node);
        Ok(handle)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id() == id)?;
        let node = self.nodes.remove(index);
        *node.controls().parent.lock() = None;
        Some(node)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Searches every subtree.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find_map(|n| n.find_mut(id))
    }

    /// Every node handle in the world, pre-order.
    pub fn handles(&self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_handles(&mut out);
        }
        out
    }

    pub fn validate(&self) -> std::result::Result<(), TopologyError> {
        let link = ParentLink::World {
            outputs: self.num_outputs,
        };
        self.nodes.iter().try_for_each(|n| n.validate_as(Some(link)))
    }

    /// Validates every subtree, then initializes them.
    pub fn initialize(&mut self, sample_rate: f64, block_size: usize) -> Result<()> {
        self.validate()?;
        for node in &mut self.nodes {
            node.initialize_subtree(sample_rate, block_size)?;
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            outputs = self.num_outputs,
            "world initialized"
        );
        Ok(())
    }

    pub fn teardown(&mut self) {
        for node in &mut self.nodes {
            node.teardown();
        }
    }

    /// Renders one block into `master`, which is cleared first.
    pub fn render(&mut self, master: &mut ChannelBuffer, frames: usize) {
        BufferPool::reset(master);
        if !self.controls.active.get() {
            return;
        }
        let world_level = self.controls.level.get();
        for node in &mut self.nodes {
            if !node.controls().active.get() {
                continue;
            }
            node.process(frames);
            if node.controls().mute.get() {
                continue;
            }
            let controls = node.controls();
            let gain = controls.level.get() * world_level;
            BufferPool::mix_mapped(
                master,
                node.subtree_output(),
                |c| controls.map_channel(c),
                gain,
            );
        }
        if self.controls.mute.get() {
            BufferPool::reset(master);
        }
    }
}
