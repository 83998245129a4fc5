use core::time::Duration;

use alloc::string::String;
use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;
use log::{debug, error, trace};

use crate::config::Config;
use crate::error::{ConnectionError, Error, TransferStage};
use crate::frame::{Command, opcode};
use crate::transport::Transport;

/// Written to find out which mode the device is in. Text mode echoes it,
/// binary mode swallows it as the first byte of a frame header.
pub const PROBE: u8 = 0x0A;
/// Text mode console command that enters binary mode
pub const BINMODE: &[u8] = b"binmode\n";
/// Completes the frame a swallowed probe byte started. The firmware answers
/// it like any other command, so the reply has to be consumed.
pub const RESYNC_SEQUENCE: [u8; 12] = [0x00, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Bytes moved from the transport per read
const SCRATCH_SIZE: usize = 256;
/// Capacity reserved up front by `read_bytes`
const MAX_PREALLOC: usize = 4096;

const DETECT_MODE: &str = "Detect current mode";
const GET_VERSION: &str = "Get Octowire version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Binary,
}

/// How long to wait for a status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wait {
    /// Use the transport's read timeout
    #[default]
    Timeout,
    /// Block until the device answers, for operations that take longer than
    /// the read timeout
    Unbounded,
}

/// Binary protocol engine for one Octowire.
///
/// Every method is a blocking request/response round trip on the transport.
/// Peripheral drivers hold an engine and build their commands on
/// [`send_operation`](Octowire::send_operation) and
/// [`read_data`](Octowire::read_data).
#[derive(Debug)]
pub struct Octowire<T, D> {
    transport: T,
    delay: D,
    config: Config,
}

impl<T, D> Octowire<T, D>
where
    T: Transport,
    D: DelayNs,
{
    pub fn new(transport: T, delay: D) -> Octowire<T, D> {
        Octowire::with_config(transport, delay, Config::default())
    }

    pub fn with_config(transport: T, delay: D, config: Config) -> Octowire<T, D> {
        Octowire {
            transport,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    /// Probe the device and report its current mode.
    ///
    /// In binary mode the probe leaves a partial frame behind in the firmware,
    /// this completes it with [`RESYNC_SEQUENCE`] and consumes the answer so
    /// the next command starts on a frame boundary.
    pub fn detect_mode(&mut self) -> Result<Mode, Error<T::Error>> {
        self.write(&[PROBE])?;
        self.settle(self.config.probe_settle);
        if self.transport.bytes_available()? > 0 {
            let echo = self.drain()?;
            trace!("discarded {} bytes of text mode echo", echo);
            debug!("Octowire is in text mode");
            return Ok(Mode::Text);
        }
        self.write(&RESYNC_SEQUENCE)?;
        self.read_status(DETECT_MODE, Wait::Timeout)?;
        self.read_data(None, DETECT_MODE)?;
        debug!("Octowire is in binary mode");
        Ok(Mode::Binary)
    }

    /// Make sure the device accepts command frames, switching it out of text
    /// mode if needed. Calling it again once in binary mode is harmless.
    pub fn ensure_binary_mode(&mut self) -> Result<(), Error<T::Error>> {
        if self.detect_mode()? == Mode::Binary {
            return Ok(());
        }
        debug!("switching Octowire to binary mode");
        self.write(BINMODE)?;
        self.settle(self.config.mode_switch_settle);
        // local echo of the binmode command
        self.drain()?;
        match self.detect_mode()? {
            Mode::Binary => Ok(()),
            Mode::Text => {
                error!("Unable to switch the Octowire to binary mode.");
                Err(Error::ModeSwitchFailure)
            }
        }
    }

    /// Query the firmware version string.
    pub fn version(&mut self) -> Result<String, Error<T::Error>> {
        self.ensure_binary_mode()?;
        let frame = Command::new(opcode::VERSION, &[]).to_vec().map_err(Error::Frame)?;
        self.write(&frame)?;
        if let Err(e) = self.read_status(GET_VERSION, Wait::Timeout) {
            error!("Error while trying to get Octowire version.");
            return Err(e);
        }
        let size = self.read_size(GET_VERSION)?;
        if size == 0 {
            error!("Invalid version size returned by the Octowire.");
            return Err(Error::Connection(ConnectionError::InvalidVersionSize));
        }
        let raw = self.read_chunk(size, GET_VERSION)?;
        String::from_utf8(raw).map_err(|_| Error::Connection(ConnectionError::InvalidVersionEncoding))
    }

    /// Check that the transport is open and a genuine Octowire answers on it,
    /// returning its version string.
    pub fn verify(&mut self) -> Result<String, Error<T::Error>> {
        if !self.transport.is_open() {
            return Err(Error::Connection(ConnectionError::NotOpen));
        }
        let version = self.version()?;
        if !version.contains(self.config.identifier) {
            return Err(Error::Connection(ConnectionError::UnexpectedVersion { found: version }));
        }
        Ok(version)
    }

    /// Like [`verify`](Octowire::verify) but logs the reason instead of
    /// returning it.
    pub fn is_connected(&mut self) -> bool {
        match self.verify() {
            Ok(version) => {
                debug!("connected to {}", version);
                true
            }
            Err(Error::Connection(ConnectionError::NotOpen)) => {
                error!("Serial port is a valid serial instance but no connection was detected.");
                false
            }
            Err(e) => {
                error!("Unable to get Octowire version: {}", e);
                false
            }
        }
    }

    /// Whether the device answers the mode probe at all.
    pub fn status_is_valid(&mut self) -> bool {
        match self.detect_mode() {
            Ok(_) => true,
            Err(e) => {
                error!("Unable to determine the Octowire mode: {}", e);
                false
            }
        }
    }

    /// Send one command frame and check its status byte.
    pub fn send_operation(
        &mut self,
        opcode: u8,
        args: &[u8],
        operation: &'static str,
    ) -> Result<(), Error<T::Error>> {
        self.send_operation_with(opcode, args, operation, Wait::Timeout)
    }

    pub fn send_operation_with(
        &mut self,
        opcode: u8,
        args: &[u8],
        operation: &'static str,
        wait: Wait,
    ) -> Result<(), Error<T::Error>> {
        let frame = Command::new(opcode, args).to_vec().map_err(Error::Frame)?;
        debug!("{}: opcode {:#04x}, {} argument bytes", operation, opcode, args.len());
        self.write(&frame)?;
        self.read_status(operation, wait)
    }

    /// Read the one byte status every response starts with.
    pub fn read_status(&mut self, operation: &'static str, wait: Wait) -> Result<(), Error<T::Error>> {
        let status = match wait {
            Wait::Timeout => self.read_bytes(1),
            Wait::Unbounded => {
                let timeout = self.transport.read_timeout();
                self.transport.set_read_timeout(None)?;
                let status = self.read_bytes(1);
                self.transport.set_read_timeout(timeout)?;
                status
            }
        }?;
        match status.first() {
            None => Err(Error::TransferFailure {
                operation,
                stage: TransferStage::Status,
            }),
            Some(0x00) => Ok(()),
            Some(code) => {
                debug!("{}: status {:#04x}", operation, code);
                Err(Error::OperationFailure { operation })
            }
        }
    }

    /// Receive a chunked response payload.
    ///
    /// With an expected size chunks are read until at least that many bytes
    /// arrived. Chunks overshooting the total are kept whole. Without one, or
    /// with an expected size of zero, a single chunk is read.
    pub fn read_data(
        &mut self,
        expected_size: Option<usize>,
        operation: &'static str,
    ) -> Result<Vec<u8>, Error<T::Error>> {
        let mut data = Vec::new();
        match expected_size {
            Some(mut remaining) if remaining > 0 => {
                while remaining > 0 {
                    let size = self.read_size(operation)?;
                    data.extend(self.read_chunk(size, operation)?);
                    remaining = remaining.saturating_sub(size);
                }
            }
            _ => {
                let size = self.read_size(operation)?;
                data.extend(self.read_chunk(size, operation)?);
            }
        }
        Ok(data)
    }

    /// Read up to `n` bytes, stopping early when the transport times out.
    ///
    /// `n` may come straight from a device supplied size prefix, so the
    /// buffer only grows as bytes actually arrive.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error<T::Error>> {
        let mut buf = Vec::with_capacity(n.min(MAX_PREALLOC));
        let mut scratch = [0; SCRATCH_SIZE];
        while buf.len() < n {
            let want = (n - buf.len()).min(SCRATCH_SIZE);
            let got = self.transport.read(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            buf.extend_from_slice(&scratch[..got]);
        }
        Ok(buf)
    }

    fn read_size(&mut self, operation: &'static str) -> Result<usize, Error<T::Error>> {
        let raw = self.read_bytes(4)?;
        let raw: [u8; 4] = raw.as_slice().try_into().map_err(|_| Error::TransferFailure {
            operation,
            stage: TransferStage::ChunkSize,
        })?;
        let size = u32::from_le_bytes(raw) as usize;
        trace!("{}: chunk of {} bytes", operation, size);
        Ok(size)
    }

    /// A chunk may come back short, only an empty one is an error.
    fn read_chunk(&mut self, size: usize, operation: &'static str) -> Result<Vec<u8>, Error<T::Error>> {
        let chunk = self.read_bytes(size)?;
        if chunk.is_empty() {
            return Err(Error::TransferFailure {
                operation,
                stage: TransferStage::Chunk,
            });
        }
        Ok(chunk)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error<T::Error>> {
        self.transport.write_all(data)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Read and discard whatever is waiting, returning how much that was.
    fn drain(&mut self) -> Result<usize, Error<T::Error>> {
        let waiting = self.transport.bytes_available()?;
        Ok(self.read_bytes(waiting)?.len())
    }

    fn settle(&mut self, duration: Duration) {
        let us = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.delay.delay_us(us);
    }
}
