//! Real-time node-tree routing kernel.
//!
//! # Primary API
//!
//! - [`Node`] / [`Processor`]: tree construction and per-node behaviour
//! - [`NodeHandle`]: control-thread access to levels, mute, channel maps and
//!   typed parameters
//! - [`World`]: top-level nodes feeding the master bus
//! - [`MasterStream`] / [`StreamController`]: the block callback and deferred
//!   topology swap
//! - [`OutputBackend`]: [`ManualBackend`] for pulled rendering, `CpalBackend`
//!   with the `"cpal"` feature
//!
//! # Example
//!
//! ```ignore
//! use arbor_core::*;
//!
//! let config = SessionConfig::default();
//! let mut world = World::new(config.num_outputs);
//! world.add(Node::new(my_source))?;
//!
//! let (mut stream, controller) = MasterStream::new(config, world)?;
//! stream.start()?;
//!
//! let mut out = vec![0u8; config.bytes_per_block()];
//! stream.process_block(&mut out);
//! ```

pub mod error;
pub use error::{AllocationError, Error, ParameterError, Result, TopologyError};

mod config;
pub use config::SessionConfig;

mod buffer;
pub use buffer::{BufferPool, ChannelBuffer, MAX_CHANNELS};

pub mod gain;
pub use gain::{db_to_linear, linear_to_db};

pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

mod params;
pub use params::{ParamCell, ParamInfo, ParamKind, ParamValue, ParameterRange};

mod events;
pub use events::{NodeEvent, SubscriptionId};

mod node;
pub use node::{NodeHandle, NodeId, ParentLink, ProcessContext, ProcessStatus, Processor};

mod tree;
pub use tree::Node;

mod world;
pub use world::{World, WorldHandle};

pub mod pcm;

mod stream;
pub use stream::{MasterStream, StreamController};

mod backend;
pub use backend::{ManualBackend, ManualPuller, OutputBackend};

#[cfg(feature = "cpal")]
mod output;
#[cfg(feature = "cpal")]
pub use output::CpalBackend;
