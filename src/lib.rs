#![no_std]
//! Host-side driver for the Octowire hardware probe.
//!
//! The probe sits behind a byte-stream [`Transport`] (usually a USB CDC serial
//! port) and speaks two dialects: a text console and a framed binary command
//! protocol. [`Octowire`] negotiates binary mode and runs request/response
//! round trips, peripheral drivers such as [`Gpio`] are built on top of it.

extern crate alloc;
#[cfg(any(test, feature = "serialport"))]
extern crate std;

mod config;
mod engine;
mod error;
mod frame;
mod gpio;
#[cfg(feature = "serialport")]
mod host;
#[cfg(test)]
mod mock;
mod serial;
mod transport;

pub trait Encode {
    type Error;

    /// Write the encoded bytes to the front of `buffer`, returning how many
    /// bytes were used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a> where Self: Sized {
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use config::Config;
pub use engine::{BINMODE, Mode, Octowire, PROBE, RESYNC_SEQUENCE, Wait};
pub use error::{ConnectionError, Error, InvalidArgument, TransferStage};
pub use frame::{Command, FrameError, HEADER_SIZE, MAX_ARGS_SIZE, opcode};
pub use gpio::{Direction, Gpio, GpioArgs, GpioOperation, Level, Pull};
#[cfg(feature = "serialport")]
pub use host::{DEFAULT_BAUD, PortConfig, SerialPortTransport, StdDelay};
pub use serial::{BufferedSerial, ErrorShim};
pub use transport::Transport;
