//! Host serial port backend (`serialport` feature).

use core::time::Duration;

use alloc::boxed::Box;
use alloc::string::String;
use embedded_hal::delay::DelayNs;
use serialport::SerialPort;
use std::io::{self, Read as _, Write as _};

use crate::transport::Transport;

/// The Octowire enumerates as a USB CDC device, the baud rate is not used by
/// the link itself
pub const DEFAULT_BAUD: u32 = 7_372_800;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// serialport has no "wait forever", an unbounded read uses this instead
const UNBOUNDED_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, Clone)]
pub struct PortConfig {
    /// e.g. /dev/ttyACM0 or COM3
    pub port_path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: String::from(port_path),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`Transport`] over an operating system serial port.
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
    unbounded: bool,
}

impl SerialPortTransport {
    pub fn open(config: &PortConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .timeout(config.timeout)
            .open()?;
        log::debug!("opened {} at {} baud", config.port_path, config.baud_rate);
        Ok(Self::new(port))
    }

    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            unbounded: false,
        }
    }

    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl embedded_io::ErrorType for SerialPortTransport {
    type Error = io::Error;
}

impl embedded_io::Read for SerialPortTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.port.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }
}

impl embedded_io::Write for SerialPortTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.port.flush()
    }
}

impl Transport for SerialPortTransport {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_timeout(&self) -> Option<Duration> {
        if self.unbounded {
            None
        } else {
            Some(self.port.timeout())
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error> {
        self.unbounded = timeout.is_none();
        self.port.set_timeout(timeout.unwrap_or(UNBOUNDED_TIMEOUT))?;
        Ok(())
    }
}

/// [`DelayNs`] backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}
