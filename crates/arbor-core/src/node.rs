//! Node behaviour contract and the control-side handle.

use crate::buffer::{ChannelBuffer, MAX_CHANNELS};
use crate::error::{ParameterError, TopologyError};
use crate::events::{EventHub, Listener, NodeEvent, SubscriptionId};
use crate::gain::{db_to_linear, linear_to_db};
use crate::lockfree::{AtomicChannelMap, AtomicFlag, AtomicFloat};
use crate::params::{ParamCell, ParamInfo, ParamKind, ParamValue};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-block result of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Continue,
    /// The processor has no more content. The block it just wrote is still
    /// used; the node deactivates afterwards.
    EndOfContent,
}

/// Buffers handed to [`Processor::process`].
///
/// `output` is cleared before every call, so a processor that writes fewer
/// samples than the block holds leaves silence behind.
pub struct ProcessContext<'a> {
    /// Mixed input of a bus node. `None` for sources.
    pub input: Option<&'a ChannelBuffer>,
    pub output: &'a mut ChannelBuffer,
    pub sample_rate: f64,
}

impl ProcessContext<'_> {
    #[inline]
    pub fn frames(&self) -> usize {
        self.output.frames()
    }
}

/// Concrete signal behaviour of a node: generators, effects, mixers.
///
/// A processor runs on the audio thread. `setup` is called on the control
/// thread while the tree is initialized.
pub trait Processor: Send {
    /// Short type name, e.g. `"sine"`.
    fn name(&self) -> &str;

    /// Default input channel count. Zero makes the node a source.
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    fn setup(&mut self, _sample_rate: f64, _block_size: usize) {}

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> ProcessStatus;

    /// Processor-specific parameters, shared with the node's handle.
    fn params(&self) -> Vec<Arc<ParamCell>> {
        Vec::new()
    }

    /// Return to the initial playback state. Called when a node that reported
    /// end of content is processed again, and after a retrigger.
    fn reset(&mut self) {}

    /// Whether activating an already active node restarts it. Sample players
    /// return true; continuous generators keep their phase.
    fn retrigger_on_activate(&self) -> bool {
        false
    }
}

/// Unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a node is attached to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// Serial insert after a source. The channel map is unused.
    Chain { parent: NodeId },
    /// Mixed into a bus with `inputs` channels.
    Bus { parent: NodeId, inputs: usize },
    /// Top-level node mixed into the master bus.
    World { outputs: usize },
}

impl ParentLink {
    fn bus_inputs(&self) -> Option<usize> {
        match *self {
            ParentLink::Chain { .. } => None,
            ParentLink::Bus { inputs, .. } => Some(inputs),
            ParentLink::World { outputs } => Some(outputs),
        }
    }
}

/// Scalar state shared between a node (audio thread) and its handles.
pub(crate) struct NodeControls {
    pub(crate) id: NodeId,
    pub(crate) kind: String,
    pub(crate) label: Mutex<String>,
    pub(crate) level: AtomicFloat,
    pub(crate) mute: AtomicFlag,
    pub(crate) active: AtomicFlag,
    pub(crate) retrigger: AtomicFlag,
    pub(crate) retrigger_on_activate: bool,
    pub(crate) initialized: AtomicFlag,
    pub(crate) num_inputs: AtomicUsize,
    pub(crate) num_outputs: AtomicUsize,
    pub(crate) max_outputs: AtomicUsize,
    pub(crate) channel_map: AtomicChannelMap,
    pub(crate) parent: Mutex<Option<ParentLink>>,
    pub(crate) params: Vec<Arc<ParamCell>>,
    pub(crate) events: EventHub,
}

impl NodeControls {
    pub(crate) fn new(processor: &dyn Processor) -> Self {
        let inputs = processor.num_inputs().min(MAX_CHANNELS);
        let outputs = processor.num_outputs().min(MAX_CHANNELS);
        Self {
            id: NodeId::next(),
            kind: processor.name().to_string(),
            label: Mutex::new(String::new()),
            level: AtomicFloat::new(1.0),
            mute: AtomicFlag::new(false),
            active: AtomicFlag::new(true),
            retrigger: AtomicFlag::new(false),
            retrigger_on_activate: processor.retrigger_on_activate(),
            initialized: AtomicFlag::new(false),
            num_inputs: AtomicUsize::new(inputs),
            num_outputs: AtomicUsize::new(outputs),
            max_outputs: AtomicUsize::new(outputs),
            channel_map: AtomicChannelMap::identity(outputs, MAX_CHANNELS),
            parent: Mutex::new(None),
            params: processor.params(),
            events: EventHub::new(),
        }
    }

    #[inline]
    pub(crate) fn num_inputs(&self) -> usize {
        self.num_inputs.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn num_outputs(&self) -> usize {
        self.num_outputs.load(Ordering::Acquire)
    }

    /// Channel count the parent sees from this node's subtree.
    #[inline]
    pub(crate) fn max_outputs(&self) -> usize {
        self.max_outputs.load(Ordering::Acquire)
    }

    /// Parent bus channel for output channel `c`, if mapped.
    #[inline]
    pub(crate) fn map_channel(&self, c: usize) -> Option<usize> {
        (c < self.channel_map.len()).then(|| self.channel_map.get(c))
    }

    pub(crate) fn parent_bus_inputs(&self) -> Option<usize> {
        let link = *self.parent.lock();
        link.and_then(|p| p.bus_inputs())
    }

    /// Checks the channel map against this node's output count and the
    /// parent bus width.
    pub(crate) fn validate_map(&self, bus_inputs: Option<usize>) -> Result<(), TopologyError> {
        let map = self.channel_map.to_vec();
        check_map(&map, self.max_outputs(), bus_inputs)
    }
}

pub(crate) fn check_map(
    map: &[usize],
    outputs: usize,
    bus_inputs: Option<usize>,
) -> Result<(), TopologyError> {
    if map.len() != outputs {
        return Err(TopologyError::ChannelMapLength {
            expected: outputs,
            found: map.len(),
        });
    }
    if let Some(bus_inputs) = bus_inputs {
        if let Some((index, &channel)) = map.iter().enumerate().find(|(_, &c)| c >= bus_inputs) {
            return Err(TopologyError::ChannelOutOfRange {
                channel,
                index,
                bus_inputs,
            });
        }
    }
    Ok(())
}

const LEVEL: &str = "level";
const DB_LEVEL: &str = "dBlevel";
const MUTE: &str = "mute";
const ACTIVE: &str = "active";
const NUM_INPUTS: &str = "numInputs";
const NUM_OUTPUTS: &str = "numOutputs";

/// Control-thread handle to a node.
///
/// Cheap to clone. Scalar writes take effect on the audio thread within one
/// block. Handles stay valid after the node is swapped out; writes are then
/// simply unobserved.
#[derive(Clone)]
pub struct NodeHandle {
    pub(crate) controls: Arc<NodeControls>,
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.controls.id)
            .field("kind", &self.controls.kind)
            .finish()
    }
}

impl NodeHandle {
    pub fn id(&self) -> NodeId {
        self.controls.id
    }

    /// Processor type name.
    pub fn kind(&self) -> &str {
        &self.controls.kind
    }

    pub fn label(&self) -> String {
        self.controls.label.lock().clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.controls.label.lock() = label.into();
    }

    pub fn level(&self) -> f32 {
        self.controls.level.get()
    }

    /// Rejects non-finite values. Negative levels invert phase.
    pub fn set_level(&self, level: f32) -> Result<(), ParameterError> {
        if !level.is_finite() {
            return Err(ParameterError::OutOfRange {
                name: LEVEL.into(),
                value: level as f64,
                min: f32::MIN as f64,
                max: f32::MAX as f64,
            });
        }
        self.controls.level.set(level);
        Ok(())
    }

    /// `20 * log10(level)`; negative infinity for non-positive levels.
    pub fn db_level(&self) -> f32 {
        linear_to_db(self.level())
    }

    /// Negative infinity silences the node. NaN and positive infinity are
    /// rejected.
    pub fn set_db_level(&self, db: f32) -> Result<(), ParameterError> {
        if db.is_nan() || db == f32::INFINITY {
            return Err(ParameterError::OutOfRange {
                name: DB_LEVEL.into(),
                value: db as f64,
                min: f64::NEG_INFINITY,
                max: f32::MAX as f64,
            });
        }
        let level = db_to_linear(db);
        if !level.is_finite() {
            return Err(ParameterError::OutOfRange {
                name: DB_LEVEL.into(),
                value: db as f64,
                min: f64::NEG_INFINITY,
                max: linear_to_db(f32::MAX) as f64,
            });
        }
        self.controls.level.set(level);
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.controls.mute.get()
    }

    pub fn set_mute(&self, mute: bool) {
        if self.controls.mute.swap(mute) != mute {
            self.controls.events.emit(NodeEvent::MuteChanged(mute));
        }
    }

    pub fn is_active(&self) -> bool {
        self.controls.active.get()
    }

    /// Writing the current value is a no-op, except for processors that opt
    /// into [`Processor::retrigger_on_activate`].
    pub fn set_active(&self, active: bool) {
        let was = self.controls.active.swap(active);
        if was == active {
            if active && self.controls.retrigger_on_activate {
                self.retrigger();
            }
            return;
        }
        self.controls.events.emit(NodeEvent::ActiveChanged(active));
    }

    /// Restarts the processor from its initial state at the next block.
    pub fn retrigger(&self) {
        self.controls.retrigger.set(true);
    }

    pub fn num_inputs(&self) -> usize {
        self.controls.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.controls.num_outputs()
    }

    /// Output count of the whole subtree as seen by the parent.
    pub fn max_outputs(&self) -> usize {
        self.controls.max_outputs()
    }

    pub fn is_source(&self) -> bool {
        self.num_inputs() == 0
    }

    pub fn is_initialized(&self) -> bool {
        self.controls.initialized.get()
    }

    pub fn set_num_inputs(&self, inputs: usize) -> Result<(), TopologyError> {
        self.check_channel_change(inputs)?;
        self.controls.num_inputs.store(inputs, Ordering::Release);
        self.emit_channels();
        Ok(())
    }

    /// Also resets the channel map to identity.
    pub fn set_num_outputs(&self, outputs: usize) -> Result<(), TopologyError> {
        self.check_channel_change(outputs)?;
        self.controls.num_outputs.store(outputs, Ordering::Release);
        self.controls.max_outputs.store(outputs, Ordering::Release);
        self.controls.channel_map.reset_identity(outputs);
        self.emit_channels();
        Ok(())
    }

    fn check_channel_change(&self, count: usize) -> Result<(), TopologyError> {
        if self.is_initialized() {
            return Err(TopologyError::ChannelCountLocked);
        }
        if count > MAX_CHANNELS {
            return Err(TopologyError::TooManyChannels {
                requested: count,
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }

    fn emit_channels(&self) {
        self.controls.events.emit(NodeEvent::ChannelsChanged {
            inputs: self.num_inputs(),
            outputs: self.num_outputs(),
        });
    }

    pub fn channel_map(&self) -> Vec<usize> {
        self.controls.channel_map.to_vec()
    }

    /// Validated against the node's output count and, once attached, the
    /// parent bus width.
    pub fn set_channel_map(&self, map: &[usize]) -> Result<(), TopologyError> {
        if map.len() > MAX_CHANNELS {
            return Err(TopologyError::TooManyChannels {
                requested: map.len(),
                max: MAX_CHANNELS,
            });
        }
        if let Err(err) = check_map(map, self.max_outputs(), self.controls.parent_bus_inputs()) {
            tracing::warn!(node = %self.id(), %err, "rejected channel map");
            return Err(err);
        }
        self.controls.channel_map.store(map);
        Ok(())
    }

    pub fn parent(&self) -> Option<ParentLink> {
        *self.controls.parent.lock()
    }

    /// Built-in stream parameters followed by processor parameters.
    pub fn params(&self) -> Vec<(ParamInfo, ParamValue)> {
        let mut table = vec![
            (
                ParamInfo::new(LEVEL, ParamKind::Float),
                ParamValue::Float(self.level() as f64),
            ),
            (
                ParamInfo::new(DB_LEVEL, ParamKind::Float),
                ParamValue::Float(self.db_level() as f64),
            ),
            (
                ParamInfo::new(MUTE, ParamKind::Boolean),
                ParamValue::Bool(self.is_muted()),
            ),
            (
                ParamInfo::new(ACTIVE, ParamKind::Boolean),
                ParamValue::Bool(self.is_active()),
            ),
            (
                ParamInfo::new(NUM_INPUTS, ParamKind::Integer).read_only(),
                ParamValue::Int(self.num_inputs() as i64),
            ),
            (
                ParamInfo::new(NUM_OUTPUTS, ParamKind::Integer).read_only(),
                ParamValue::Int(self.num_outputs() as i64),
            ),
        ];
        table.extend(
            self.controls
                .params
                .iter()
                .map(|cell| (cell.info().clone(), cell.get())),
        );
        table
    }

    pub fn get_parameter(&self, name: &str) -> Result<ParamValue, ParameterError> {
        let value = match name {
            LEVEL => ParamValue::Float(self.level() as f64),
            DB_LEVEL => ParamValue::Float(self.db_level() as f64),
            MUTE => ParamValue::Bool(self.is_muted()),
            ACTIVE => ParamValue::Bool(self.is_active()),
            NUM_INPUTS => ParamValue::Int(self.num_inputs() as i64),
            NUM_OUTPUTS => ParamValue::Int(self.num_outputs() as i64),
            _ => self.find_param(name)?.get(),
        };
        Ok(value)
    }

    /// Type-checked write. On error nothing changes.
    pub fn set_parameter(&self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        match name {
            LEVEL => {
                let level = expect_float(name, value)?;
                self.set_level(level as f32)
            }
            DB_LEVEL => {
                let db = expect_float(name, value)?;
                self.set_db_level(db as f32)
            }
            MUTE => {
                self.set_mute(expect_bool(name, value)?);
                Ok(())
            }
            ACTIVE => {
                self.set_active(expect_bool(name, value)?);
                Ok(())
            }
            NUM_INPUTS | NUM_OUTPUTS => Err(ParameterError::ReadOnly(name.into())),
            _ => self.find_param(name)?.set(value),
        }
    }

    fn find_param(&self, name: &str) -> Result<&Arc<ParamCell>, ParameterError> {
        self.controls
            .params
            .iter()
            .find(|cell| cell.name() == name)
            .ok_or_else(|| ParameterError::Unknown(name.into()))
    }

    /// Register a change listener. Fires only on actual changes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.controls.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.controls.events.unsubscribe(id)
    }

    /// Deliver events raised on the audio thread. Returns how many were
    /// delivered.
    pub fn dispatch_events(&self) -> usize {
        self.controls.events.dispatch()
    }
}

fn expect_float(name: &str, value: ParamValue) -> Result<f64, ParameterError> {
    value.as_f64().ok_or_else(|| ParameterError::TypeMismatch {
        name: name.into(),
        expected: ParamKind::Float.name(),
        found: value.kind().name(),
    })
}

fn expect_bool(name: &str, value: ParamValue) -> Result<bool, ParameterError> {
    value.as_bool().ok_or_else(|| ParameterError::TypeMismatch {
        name: name.into(),
        expected: ParamKind::Boolean.name(),
        found: value.kind().name(),
    })
}
