use alloc::vec;
use alloc::vec::Vec;
use thiserror::Error;

use crate::{Decode, Encode};

/// args_size: 2, opcode: 1
pub const HEADER_SIZE: usize = 3;
/// args_size is a u16, so that is the most argument bytes a frame can carry
pub const MAX_ARGS_SIZE: usize = u16::MAX as usize;

/// Module opcodes understood by the firmware.
pub mod opcode {
    /// Firmware version string
    pub const VERSION: u8 = 0x02;
    pub const GPIO: u8 = 0x08;
}

/// A binary mode command: little endian argument length, opcode, arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    opcode: u8,
    args: &'a [u8],
}

impl<'a> Command<'a> {
    pub const fn new(opcode: u8, args: &'a [u8]) -> Command<'a> {
        Command { opcode, args }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn args(&self) -> &'a [u8] {
        self.args
    }

    /// Length on the wire including the header
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.args.len()
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, FrameError> {
        let mut buf = vec![0; self.size()];
        self.encode(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("command arguments are {found} bytes, at most {max} fit in a frame")]
    ArgumentsTooLarge { max: usize, found: usize },
    #[error("encode buffer holds {found} bytes, frame needs {expected}")]
    EncodeBufferTooSmall { expected: usize, found: usize },
    #[error("frame needs at least {expected_at_least} bytes, got {found}")]
    DecodeBufferTooSmall {
        expected_at_least: usize,
        found: usize,
    },
}

impl<'a> Encode for Command<'a> {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if self.args.len() > MAX_ARGS_SIZE {
            return Err(FrameError::ArgumentsTooLarge {
                max: MAX_ARGS_SIZE,
                found: self.args.len(),
            });
        }
        if buffer.len() < self.size() {
            return Err(FrameError::EncodeBufferTooSmall {
                expected: self.size(),
                found: buffer.len(),
            });
        }
        // ARGS_SIZE: 2, OPCODE: 1, ARGS: args_size
        let args_size = (self.args.len() as u16).to_le_bytes();
        buffer[0..2].copy_from_slice(&args_size);
        buffer[2] = self.opcode;
        buffer[HEADER_SIZE..self.size()].copy_from_slice(self.args);
        Ok(self.size())
    }
}

impl<'a> Decode<'a> for Command<'a> {
    type Error = FrameError;

    /// Bytes past the end of the frame are left alone, `size()` tells the
    /// caller how much was consumed.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        if data.len() < HEADER_SIZE {
            return Err(FrameError::DecodeBufferTooSmall {
                expected_at_least: HEADER_SIZE,
                found: data.len(),
            });
        }
        let args_size = u16::from_le_bytes([data[0], data[1]]) as usize;
        if data.len() < HEADER_SIZE + args_size {
            return Err(FrameError::DecodeBufferTooSmall {
                expected_at_least: HEADER_SIZE + args_size,
                found: data.len(),
            });
        }
        Ok(Command {
            opcode: data[2],
            args: &data[HEADER_SIZE..HEADER_SIZE + args_size],
        })
    }
}
