//! Error types for arbor-core.

use thiserror::Error;

/// Error type for arbor-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Stream is running")]
    StreamRunning,

    #[error("Stream is stopped")]
    StreamStopped,

    #[error("A world swap is already pending")]
    CommitPending,

    #[error("Audio thread did not hand the stream back")]
    HandoffTimeout,

    #[cfg(feature = "cpal")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A buffer was requested with a zero dimension.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot allocate a {channels}x{samples} buffer")]
pub struct AllocationError {
    pub channels: usize,
    pub samples: usize,
}

/// Structural problems in the node tree, raised before a node is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Channel map has {found} entries, node has {expected} outputs")]
    ChannelMapLength { expected: usize, found: usize },

    #[error("Channel map entry {index} targets channel {channel}, parent has {bus_inputs} inputs")]
    ChannelOutOfRange {
        channel: usize,
        index: usize,
        bus_inputs: usize,
    },

    #[error("Chain position {position} expects {expected} inputs, node has {found}")]
    ChainMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("{requested} channels exceeds the maximum of {max}")]
    TooManyChannels { requested: usize, max: usize },

    #[error("Channel counts cannot change after initialization")]
    ChannelCountLocked,

    #[error("World has {world} outputs, session has {session}")]
    OutputMismatch { world: usize, session: usize },
}

/// Rejected parameter reads and writes. State is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Unknown parameter: {0}")]
    Unknown(String),

    #[error("Parameter '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Parameter '{name}' value {value} outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Parameter '{0}' is read-only")]
    ReadOnly(String),
}
