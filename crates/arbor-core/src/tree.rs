//! Node tree: ownership, validation, initialization and per-block dispatch.
//!
//! A node with no inputs is a *source*: its children form a serial insert
//! chain fed by the source's own signal. A node with inputs is a *bus*: its
//! children are processed independently and summed into its input buffer
//! through their channel maps, then the bus's processor runs on the mix.

use crate::buffer::{BufferPool, ChannelBuffer};
use crate::error::{AllocationError, TopologyError};
use crate::events::NodeEvent;
use crate::node::{check_map, NodeControls, NodeHandle, NodeId, ParentLink, ProcessContext};
use crate::node::{ProcessStatus, Processor};
use crate::Result;
use std::sync::Arc;

/// A node in the routing tree. Owns its processor, buffers and children.
pub struct Node {
    controls: Arc<NodeControls>,
    processor: Box<dyn Processor>,
    children: Vec<Node>,
    input: Option<ChannelBuffer>,
    output: ChannelBuffer,
    sample_rate: f64,
    finished: bool,
}

impl Node {
    pub fn new<P: Processor + 'static>(processor: P) -> Self {
        Self::boxed(Box::new(processor))
    }

    pub fn boxed(processor: Box<dyn Processor>) -> Self {
        let controls = Arc::new(NodeControls::new(processor.as_ref()));
        Self {
            controls,
            processor,
            children: Vec::new(),
            input: None,
            output: ChannelBuffer::default(),
            sample_rate: 0.0,
            finished: false,
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.handle().set_label(label);
        self
    }

    pub fn with_level(self, level: f32) -> Result<Self> {
        self.handle().set_level(level)?;
        Ok(self)
    }

    pub fn with_channel_map(self, map: &[usize]) -> Result<Self> {
        self.handle().set_channel_map(map)?;
        Ok(self)
    }

    pub fn with_outputs(self, outputs: usize) -> Result<Self> {
        self.handle().set_num_outputs(outputs)?;
        Ok(self)
    }

    pub fn with_inputs(self, inputs: usize) -> Result<Self> {
        self.handle().set_num_inputs(inputs)?;
        Ok(self)
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            controls: Arc::clone(&self.controls),
        }
    }

    pub fn id(&self) -> NodeId {
        self.controls.id
    }

    #[inline]
    pub fn is_source(&self) -> bool {
        self.controls.num_inputs() == 0
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mixed children from the last block. `None` for sources and before
    /// initialization.
    pub fn input(&self) -> Option<&ChannelBuffer> {
        self.input.as_ref()
    }

    /// Depth-first search of this subtree, including `self`.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id() == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Appends a child.
    ///
    /// On a source the child becomes the next insert of the chain and must
    /// accept the current tail's channel count; the source's reported output
    /// count then follows the new tail. On a bus the child's channel map is
    /// checked against the bus width.
    pub fn add_child(&mut self, child: Node) -> std::result::Result<NodeHandle, TopologyError> {
        let link = if self.is_source() {
            let expected = self.chain_outputs();
            let found = child.controls.num_inputs();
            if found != expected {
                let err = TopologyError::ChainMismatch {
                    position: self.children.len(),
                    expected,
                    found,
                };
                tracing::warn!(parent = %self.id(), child = %child.id(), %err, "rejected chain insert");
                return Err(err);
            }
            ParentLink::Chain { parent: self.id() }
        } else {
            let inputs = self.controls.num_inputs();
            if let Err(err) = child.controls.validate_map(Some(inputs)) {
                tracing::warn!(parent = %self.id(), child = %child.id(), %err, "rejected bus child");
                return Err(err);
            }
            ParentLink::Bus {
                parent: self.id(),
                inputs,
            }
        };

        *child.controls.parent.lock() = Some(link);
        let handle = child.handle();
        self.children.push(child);
        if self.is_source() {
            self.follow_chain_tail();
        }
        Ok(handle)
    }

    /// Detaches a direct child.
    pub fn remove_child(&mut self, id: NodeId) -> Option<Node> {
        let index = self.children.iter().position(|c| c.id() == id)?;
        let child = self.children.remove(index);
        *child.controls.parent.lock() = None;
        if self.is_source() {
            self.follow_chain_tail();
        }
        Some(child)
    }

    fn follow_chain_tail(&self) {
        let tail = self.chain_outputs();
        self.controls
            .max_outputs
            .store(tail, std::sync::atomic::Ordering::Release);
        self.controls.channel_map.reset_identity(tail);
    }

    /// Output count at the end of the insert chain.
    fn chain_outputs(&self) -> usize {
        self.children
            .last()
            .map(|c| c.controls.num_outputs())
            .unwrap_or_else(|| self.controls.num_outputs())
    }

    /// Channel count this subtree delivers to its parent.
    pub fn effective_outputs(&self) -> usize {
        if self.is_source() {
            self.chain_outputs()
        } else {
            self.controls.num_outputs()
        }
    }

    /// Checks channel maps and chain compatibility for the whole subtree.
    pub fn validate(&self) -> std::result::Result<(), TopologyError> {
        let link = *self.controls.parent.lock();
        self.validate_as(link)
    }

    pub(crate) fn validate_as(&self, link: Option<ParentLink>) -> std::result::Result<(), TopologyError> {
        *self.controls.parent.lock() = link;

        if !matches!(link, Some(ParentLink::Chain { .. })) {
            let bus_inputs = match link {
                Some(ParentLink::Bus { inputs, .. }) => Some(inputs),
                Some(ParentLink::World { outputs }) => Some(outputs),
                _ => None,
            };
            let map = self.controls.channel_map.to_vec();
            check_map(&map, self.effective_outputs(), bus_inputs)?;
        }

        if self.is_source() {
            let mut expected = self.controls.num_outputs();
            for (position, child) in self.children.iter().enumerate() {
                let found = child.controls.num_inputs();
                if found != expected {
                    return Err(TopologyError::ChainMismatch {
                        position,
                        expected,
                        found,
                    });
                }
                child.validate_as(Some(ParentLink::Chain { parent: self.id() }))?;
                expected = child.controls.num_outputs();
            }
        } else {
            let link = ParentLink::Bus {
                parent: self.id(),
                inputs: self.controls.num_inputs(),
            };
            for child in &self.children {
                child.validate_as(Some(link))?;
            }
        }
        Ok(())
    }

    /// Validates, then allocates buffers and runs setup hooks, parent before
    /// children. Buffers with unchanged geometry are reused.
    pub fn initialize(&mut self, sample_rate: f64, block_size: usize) -> Result<()> {
        self.validate()?;
        self.initialize_subtree(sample_rate, block_size)
    }

    pub(crate) fn initialize_subtree(&mut self, sample_rate: f64, block_size: usize) -> Result<()> {
        let inputs = self.controls.num_inputs();
        let outputs = self.controls.num_outputs();

        self.input = if inputs > 0 {
            Some(reuse_or_allocate(self.input.take(), inputs, block_size)?)
        } else {
            None
        };
        let output = std::mem::take(&mut self.output);
        self.output = reuse_or_allocate(Some(output), outputs, block_size)?;

        self.sample_rate = sample_rate;
        self.processor.setup(sample_rate, block_size);
        self.controls.initialized.set(true);

        tracing::debug!(
            node = %self.id(),
            kind = %self.controls.kind,
            inputs,
            outputs,
            block_size,
            "node initialized"
        );

        for child in &mut self.children {
            child.initialize_subtree(sample_rate, block_size)?;
        }
        Ok(())
    }

    /// Releases buffers for the whole subtree. Channel counts unlock.
    pub fn teardown(&mut self) {
        self.input = None;
        self.output = ChannelBuffer::default();
        self.controls.initialized.set(false);
        for child in &mut self.children {
            child.teardown();
        }
        tracing::debug!(node = %self.id(), "node torn down");
    }

    /// Renders one block and returns the subtree's output.
    ///
    /// The returned buffer always holds `effective_outputs() x frames`
    /// samples once the node is initialized.
    pub fn process(&mut self, frames: usize) -> &ChannelBuffer {
        debug_assert!(
            !self.controls.initialized.get() || frames == self.output.frames(),
            "block size is fixed at initialize"
        );
        self.render();
        self.subtree_output()
    }

    /// Last rendered output of the subtree.
    pub fn subtree_output(&self) -> &ChannelBuffer {
        if self.is_source() {
            if let Some(tail) = self.children.last() {
                return &tail.output;
            }
        }
        &self.output
    }

    fn render(&mut self) {
        self.rewind_if_requested();
        if self.is_source() {
            self.render_source();
        } else {
            if let Some(input) = self.input.as_mut() {
                BufferPool::reset(input);
            }
            self.mix_children();
            self.run_processor();
        }
    }

    fn rewind_if_requested(&mut self) {
        if self.controls.retrigger.swap(false) || self.finished {
            self.finished = false;
            self.processor.reset();
        }
    }

    fn render_source(&mut self) {
        self.run_processor();
        for i in 0..self.children.len() {
            let (done, rest) = self.children.split_at_mut(i);
            let upstream = match done.last() {
                Some(prev) => &prev.output,
                None => &self.output,
            };
            rest[0].render_insert(upstream);
        }
    }

    /// Chain insert: the upstream signal becomes this node's input, any
    /// children are mixed on top, then the processor runs.
    fn render_insert(&mut self, upstream: &ChannelBuffer) {
        if !self.controls.active.get() {
            BufferPool::copy_overlap(&mut self.output, upstream);
            return;
        }
        self.rewind_if_requested();
        if let Some(input) = self.input.as_mut() {
            BufferPool::copy_overlap(input, upstream);
        }
        self.mix_children();
        self.run_processor();
        if self.controls.mute.get() {
            BufferPool::reset(&mut self.output);
        }
    }

    fn mix_children(&mut self) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        for child in &mut self.children {
            if !child.controls.active.get() {
                continue;
            }
            child.render();
            if child.controls.mute.get() {
                continue;
            }
            let level = child.controls.level.get();
            let controls = &child.controls;
            BufferPool::mix_mapped(
                input,
                child.subtree_output(),
                |c| controls.map_channel(c),
                level,
            );
        }
    }

    fn run_processor(&mut self) {
        BufferPool::reset(&mut self.output);
        let mut ctx = ProcessContext {
            input: self.input.as_ref(),
            output: &mut self.output,
            sample_rate: self.sample_rate,
        };
        let status = self.processor.process(&mut ctx);
        if status == ProcessStatus::EndOfContent && !self.finished {
            self.finished = true;
            self.controls.active.set(false);
            self.controls.events.post(NodeEvent::EndOfContent);
            self.controls.events.post(NodeEvent::ActiveChanged(false));
        }
    }

    /// Handles for this node and every descendant, pre-order.
    pub fn handles(&self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        self.collect_handles(&mut out);
        out
    }

    pub(crate) fn collect_handles(&self, out: &mut Vec<NodeHandle>) {
        out.push(self.handle());
        for child in &self.children {
            child.collect_handles(out);
        }
    }

    pub(crate) fn controls(&self) -> &NodeControls {
        &self.controls
    }
}

fn reuse_or_allocate(
    existing: Option<ChannelBuffer>,
    channels: usize,
    frames: usize,
) -> std::result::Result<ChannelBuffer, AllocationError> {
    match existing {
        Some(mut buffer) if buffer.has_geometry(channels, frames) => {
            BufferPool::reset(&mut buffer);
            Ok(buffer)
        }
        _ => BufferPool::allocate(channels, frames),
    }
}
