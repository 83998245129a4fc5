use core::time::Duration;

use embedded_io::{Read, Write};

/// Byte-stream link to the probe.
///
/// `read` blocks until at least one byte arrives or the read timeout expires,
/// in which case it returns `Ok(0)`. The engine treats a zero-length read as the
/// device having gone quiet.
pub trait Transport: Read + Write {
    /// Number of received bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    /// Current read timeout, `None` waits forever.
    fn read_timeout(&self) -> Option<Duration>;

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error>;

    /// Whether the underlying connection is still usable.
    fn is_open(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        T::bytes_available(self)
    }

    fn read_timeout(&self) -> Option<Duration> {
        T::read_timeout(self)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error> {
        T::set_read_timeout(self, timeout)
    }

    fn is_open(&self) -> bool {
        T::is_open(self)
    }
}
