//! Error Module
//!
//! Error taxonomy shared by the configuration model and the stream adapter.

use std::io;

/// Result type alias
pub type Result<T> = std::result::Result<T, SerialError>;

/// Serial port error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerialError {
    /// Operation requires an open port
    #[error("Serial port not open")]
    NotOpen,

    /// Open called on a port that is already open
    #[error("Serial port already open")]
    AlreadyOpen,

    /// Opening or initially configuring the device failed
    #[error("Open failed: {0}")]
    OpenFailed(String),

    /// Parameter outside its accepted enumeration or range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Query, apply, flush or transfer call failed on an open port
    #[error("I/O failure: {0}")]
    Io(String),

    /// Line settings decode to no supported value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<SerialError> for io::Error {
    fn from(err: SerialError) -> Self {
        let kind = match err {
            SerialError::NotOpen => io::ErrorKind::NotConnected,
            SerialError::AlreadyOpen => io::ErrorKind::AlreadyExists,
            SerialError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            SerialError::InvalidConfiguration(_) => io::ErrorKind::InvalidData,
            SerialError::OpenFailed(_) | SerialError::Io(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
