use alloc::string::String;

use thiserror::Error;

use crate::frame::FrameError;

/// Error type for every engine and driver operation, `E` is the transport's
/// own I/O error.
#[derive(Debug, Error)]
pub enum Error<E> {
    #[error("invalid argument: {0}")]
    InvalidArgument(InvalidArgument),
    #[error("connection error: {0}")]
    Connection(ConnectionError),
    /// The device stayed in text mode after `binmode`
    #[error("unable to switch the Octowire to binary mode")]
    ModeSwitchFailure,
    /// The device answered with a non-zero status byte
    #[error("operation '{operation}' returned an error")]
    OperationFailure { operation: &'static str },
    /// A read the protocol requires came back empty
    #[error("no {stage} received from the Octowire (operation: {operation})")]
    TransferFailure {
        operation: &'static str,
        stage: TransferStage,
    },
    #[error("framing error: {0}")]
    Frame(FrameError),
    #[error("transport error: {0:?}")]
    Transport(E),
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Error::Transport(value)
    }
}

/// Rejected before anything was written to the transport.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("gpio pin {0} should be defined between 0 and 15")]
    PinOutOfRange(u8),
    #[error("pin direction {0}, should be 0 for output or 1 for input")]
    Direction(u8),
    #[error("pull value {0}, should be 0 for pull-up, 1 for pull-down or none for pull disabled")]
    Pull(u8),
    #[error("status value {0}, should be 0 for low or 1 for high")]
    Level(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The transport reports that it is closed
    #[error("serial port is not open")]
    NotOpen,
    /// The device reported a zero length version string
    #[error("invalid version size returned by the Octowire")]
    InvalidVersionSize,
    #[error("version string is not valid utf-8")]
    InvalidVersionEncoding,
    /// The version string lacks the expected identifier
    #[error("unexpected version string {found:?}")]
    UnexpectedVersion { found: String },
}

/// Which read of a response came back empty.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    #[error("status byte")]
    Status,
    #[error("chunk size")]
    ChunkSize,
    #[error("data")]
    Chunk,
    #[error("pin level")]
    PinLevel,
}
