//! # Arbor - Real-time Node-Tree Audio Engine
//!
//! Block-based multichannel routing: sources feed insert chains, buses mix
//! their children through channel maps, and the world sums everything into
//! a master bus rendered as interleaved 16-bit PCM.
//!
//! ## Architecture
//!
//! Arbor is an umbrella crate that coordinates:
//! - **arbor-core** - Node tree, buffers, parameters, master stream, backends
//! - **arbor-nodes** - Built-in processors (constant, sine, one-shot, gain,
//!   passthrough, sharpen)
//!
//! ## Quick Start
//!
//! ```
//! use arbor::prelude::*;
//!
//! let engine = ArborEngine::builder()
//!     .sample_rate(44100)
//!     .block_size(128)
//!     .outputs(2)
//!     .build()?;
//!
//! // A mono tone panned into the left channel through a stereo bus
//! let mut bus = Node::new(Passthrough::stereo());
//! let tone = bus.add_child(Node::new(Sine::new(220.0, 1)?).with_channel_map(&[0])?)?;
//! engine.graph(|world| world.add(bus))??;
//!
//! tone.set_db_level(-6.0)?;
//! let pcm = engine.render_blocks(8)?;
//! assert_eq!(pcm.len(), 8 * engine.bytes_per_block());
//! # Ok::<(), arbor::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Engine with the manual (pulled) backend
//! - `cpal` - Hardware output through CPAL

/// Re-export of arbor-core for direct access
pub use arbor_core as core;

/// Re-export of arbor-nodes
pub use arbor_nodes as nodes;

pub use arbor_core::{
    db_to_linear, linear_to_db, ChannelBuffer, ManualBackend, ManualPuller, MasterStream, Node,
    NodeEvent, NodeHandle, NodeId, OutputBackend, ParamInfo, ParamKind, ParamValue,
    ParameterRange, ProcessContext, ProcessStatus, Processor, SessionConfig, World, WorldHandle,
};

pub use arbor_nodes::{Constant, Gain, OneShot, Passthrough, Sharpen, Sine};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::ArborEngineBuilder;
pub use engine::ArborEngine;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{ArborEngine, ArborEngineBuilder};

    pub use crate::core::{
        Node, NodeEvent, NodeHandle, ParamValue, ProcessContext, ProcessStatus, Processor,
        SessionConfig, World,
    };

    pub use crate::nodes::{Constant, Gain, OneShot, Passthrough, Sharpen, Sine};
}
