//! Centralized error type for the arbor umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] arbor_core::Error),

    #[error("Nodes: {0}")]
    Nodes(#[from] arbor_nodes::Error),

    #[error("Backend '{0}' refused the stream")]
    BackendRejected(String),

    #[error("Backend '{0}' lost the stream; rebuild the engine")]
    StreamLost(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<arbor_core::TopologyError> for Error {
    fn from(err: arbor_core::TopologyError) -> Self {
        Error::Core(err.into())
    }
}

impl From<arbor_core::ParameterError> for Error {
    fn from(err: arbor_core::ParameterError) -> Self {
        Error::Core(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
