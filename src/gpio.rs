use bilge::prelude::*;
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::engine::Octowire;
use crate::error::{Error, InvalidArgument, TransferStage};
use crate::frame::opcode;
use crate::transport::Transport;

/// Second argument byte of a GPIO command.
#[bitsize(8)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq)]
pub enum GpioOperation {
    SetOutput = 0x01,
    SetInput = 0x02,
    PullUp = 0x03,
    PullDown = 0x04,
    DisablePull = 0x05,
    SetHigh = 0x06,
    SetLow = 0x07,
    ReadPin = 0x08,
    #[fallback]
    Reserved = 0xFF,
}

/// Argument body of a GPIO command, `[pin, operation]` on the wire.
#[bitsize(16)]
#[derive(DebugBits, Clone, Copy, PartialEq, FromBits)]
pub struct GpioArgs {
    pub pin: u4,
    _reserved: u4,
    pub operation: GpioOperation,
}

impl GpioArgs {
    pub fn bytes(&self) -> [u8; 2] {
        self.value.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 2]) -> GpioArgs {
        GpioArgs::from(u16::from_le_bytes(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Output = 0,
    Input = 1,
}

impl TryFrom<u8> for Direction {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Output),
            1 => Ok(Direction::Input),
            v => Err(InvalidArgument::Direction(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Disabled,
}

/// `None` disables the pull resistor, `0` is pull-up and `1` pull-down.
impl TryFrom<Option<u8>> for Pull {
    type Error = InvalidArgument;

    fn try_from(value: Option<u8>) -> Result<Self, Self::Error> {
        match value {
            None => Ok(Pull::Disabled),
            Some(0) => Ok(Pull::Up),
            Some(1) => Ok(Pull::Down),
            Some(v) => Err(InvalidArgument::Pull(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    pub fn toggled(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            v => Err(InvalidArgument::Level(v)),
        }
    }
}

/// One GPIO pin of the Octowire.
///
/// Direction, pull and output level are remembered after each successful
/// command and never read back from the device, so they go stale if the
/// probe is reset behind our back. [`forget_state`](Gpio::forget_state)
/// clears them.
#[derive(Debug)]
pub struct Gpio<T, D> {
    octowire: Octowire<T, D>,
    pin: u4,
    direction_status: Option<u8>,
    pull: Option<Pull>,
    status: Level,
}

impl<T, D> Gpio<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Bind to `pin` (0 to 15) and put the device in binary mode.
    pub fn new(mut octowire: Octowire<T, D>, pin: u8) -> Result<Gpio<T, D>, Error<T::Error>> {
        let pin = u4::try_new(pin)
            .map_err(|_| Error::InvalidArgument(InvalidArgument::PinOutOfRange(pin)))?;
        octowire.ensure_binary_mode()?;
        Ok(Gpio {
            octowire,
            pin,
            direction_status: None,
            pull: None,
            status: Level::Low,
        })
    }

    pub fn pin(&self) -> u8 {
        self.pin.value()
    }

    /// Cached direction flag: `1` after switching to output, `0` after
    /// switching to input, `None` until set.
    pub fn direction_status(&self) -> Option<u8> {
        self.direction_status
    }

    pub fn pull(&self) -> Option<Pull> {
        self.pull
    }

    /// Last output level we drove.
    pub fn status(&self) -> Level {
        self.status
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), Error<T::Error>> {
        match direction {
            Direction::Output => {
                self.send(GpioOperation::SetOutput, "set GPIO pin as output")?;
                self.direction_status = Some(1);
            }
            Direction::Input => {
                self.send(GpioOperation::SetInput, "set GPIO pin as input")?;
                self.direction_status = Some(0);
            }
        }
        Ok(())
    }

    pub fn set_pull(&mut self, pull: Pull) -> Result<(), Error<T::Error>> {
        match pull {
            Pull::Disabled => self.send(GpioOperation::DisablePull, "GPIO pull disable")?,
            Pull::Up => self.send(GpioOperation::PullUp, "GPIO set pull-up")?,
            Pull::Down => self.send(GpioOperation::PullDown, "GPIO set pull-down")?,
        }
        self.pull = Some(pull);
        Ok(())
    }

    pub fn set_status(&mut self, level: Level) -> Result<(), Error<T::Error>> {
        match level {
            Level::Low => self.send(GpioOperation::SetLow, "Set GPIO pin to low")?,
            Level::High => self.send(GpioOperation::SetHigh, "Set GPIO pin to high")?,
        }
        self.status = level;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), Error<T::Error>> {
        self.set_status(self.status.toggled())
    }

    /// Sample the input level. The level byte follows the status byte
    /// directly, it is not chunked.
    pub fn read(&mut self) -> Result<u8, Error<T::Error>> {
        const OPERATION: &str = "GPIO read input pin";
        self.send(GpioOperation::ReadPin, OPERATION)?;
        match self.octowire.read_bytes(1)?.first() {
            Some(&level) => Ok(level),
            None => Err(Error::TransferFailure {
                operation: OPERATION,
                stage: TransferStage::PinLevel,
            }),
        }
    }

    /// Drop the cached pin state, for when the device may have been reset.
    pub fn forget_state(&mut self) {
        self.direction_status = None;
        self.pull = None;
        self.status = Level::Low;
    }

    pub fn octowire(&self) -> &Octowire<T, D> {
        &self.octowire
    }

    pub fn octowire_mut(&mut self) -> &mut Octowire<T, D> {
        &mut self.octowire
    }

    pub fn release(self) -> Octowire<T, D> {
        self.octowire
    }

    fn send(&mut self, operation: GpioOperation, name: &'static str) -> Result<(), Error<T::Error>> {
        let args = GpioArgs::new(self.pin, operation);
        debug!("gpio {}: {:?}", self.pin.value(), operation);
        self.octowire.send_operation(opcode::GPIO, &args.bytes(), name)
    }
}
