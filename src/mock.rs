//! In-memory stand-ins for the probe and the clock.

use core::convert::Infallible;
use core::time::Duration;

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorType, Read, Write};

use crate::engine::Mode;
use crate::frame::{Command, opcode};
use crate::gpio::GpioOperation;
use crate::{Decode, Transport};

/// Simulated firmware. Text mode echoes everything back, binary mode parses
/// frames and answers them.
#[derive(Debug)]
pub struct MockDevice {
    pub mode: Mode,
    pub version: String,
    /// Status byte sent back for every GPIO command
    pub gpio_status: u8,
    pub pin_level: u8,
    /// Stay in text mode when `binmode` arrives
    pub ignore_binmode: bool,
    /// Never answer binary frames
    pub silent: bool,
    pub open: bool,
    /// Every byte the host wrote, in order
    pub written: Vec<u8>,
    /// Every binary frame the device decoded
    pub frames: Vec<(u8, Vec<u8>)>,
    pub timeout_history: Vec<Option<Duration>>,
    /// Canned answers used, in order, instead of the default ones
    pub replies: VecDeque<Vec<u8>>,
    rx: VecDeque<u8>,
    pending: Vec<u8>,
    line: Vec<u8>,
    timeout: Option<Duration>,
}

impl MockDevice {
    pub fn new(mode: Mode) -> MockDevice {
        MockDevice {
            mode,
            version: String::from("Octowire v1.1.0"),
            gpio_status: 0,
            pin_level: 1,
            ignore_binmode: false,
            silent: false,
            open: true,
            written: Vec::new(),
            frames: Vec::new(),
            timeout_history: Vec::new(),
            replies: VecDeque::new(),
            rx: VecDeque::new(),
            pending: Vec::new(),
            line: Vec::new(),
            timeout: Some(Duration::from_secs(1)),
        }
    }

    pub fn text() -> MockDevice {
        MockDevice::new(Mode::Text)
    }

    pub fn binary() -> MockDevice {
        MockDevice::new(Mode::Binary)
    }

    /// Queue raw bytes as if the device had sent them.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Queue a `chunk_size | data` payload chunk.
    pub fn push_chunk(&mut self, data: &[u8]) {
        self.push_rx(&(data.len() as u32).to_le_bytes());
        self.push_rx(data);
    }

    pub fn push_reply(&mut self, data: &[u8]) {
        self.replies.push_back(data.to_vec());
    }

    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    /// Frames with the given opcode, in arrival order.
    pub fn frames_with(&self, op: u8) -> Vec<Vec<u8>> {
        self.frames
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn on_text(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
        for &b in data {
            if b != b'\n' {
                self.line.push(b);
                continue;
            }
            if self.line == b"binmode" && !self.ignore_binmode {
                self.mode = Mode::Binary;
            }
            self.line.clear();
        }
    }

    fn on_binary(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
        loop {
            let (op, args, size) = match Command::decode(&self.pending) {
                Ok(c) => (c.opcode(), c.args().to_vec(), c.size()),
                Err(_) => break,
            };
            self.pending.drain(0..size);
            self.respond(op, &args);
            self.frames.push((op, args));
        }
    }

    fn respond(&mut self, op: u8, args: &[u8]) {
        if self.silent {
            return;
        }
        if let Some(reply) = self.replies.pop_front() {
            self.push_rx(&reply);
            return;
        }
        match op {
            opcode::VERSION => {
                self.push_rx(&[0x00]);
                let version = self.version.clone();
                self.push_chunk(version.as_bytes());
            }
            opcode::GPIO => {
                self.push_rx(&[self.gpio_status]);
                let read_pin = args.get(1) == Some(&(GpioOperation::ReadPin as u8));
                if self.gpio_status == 0 && read_pin {
                    self.push_rx(&[self.pin_level]);
                }
            }
            _ => self.push_rx(&[0x01]),
        }
    }
}

impl ErrorType for MockDevice {
    type Error = Infallible;
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(0..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        match self.mode {
            Mode::Text => self.on_text(buf),
            Mode::Binary => self.on_binary(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for MockDevice {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.rx.len())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error> {
        self.timeout_history.push(timeout);
        self.timeout = timeout;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Clock that never sleeps, only counts.
#[derive(Debug, Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_us(&mut self, us: u32) {
        self.total_ns += us as u64 * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
    }
}
