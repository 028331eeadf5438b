//! Error types for arbor-nodes

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidChannelCount(String),
    InvalidSampleData(String),
    InvalidParameter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidChannelCount(msg) => write!(f, "Invalid channel count: {}", msg),
            Error::InvalidSampleData(msg) => write!(f, "Invalid sample data: {}", msg),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_channels(what: &str, channels: usize) -> Result<()> {
    if channels == 0 || channels > arbor_core::MAX_CHANNELS {
        return Err(Error::InvalidChannelCount(format!(
            "{what} needs 1-{} channels, got {channels}",
            arbor_core::MAX_CHANNELS
        )));
    }
    Ok(())
}
