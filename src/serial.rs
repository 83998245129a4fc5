use core::time::Duration;

use alloc::collections::VecDeque;
use embedded_hal::delay::DelayNs;
use embedded_hal_nb::serial::{self, ErrorType, Read, Write};

use crate::transport::Transport;

/// How long to sleep between polls of an idle uart
const POLL_INTERVAL_US: u32 = 100;

/// Adapts a non-blocking uart into a blocking [`Transport`].
///
/// Received words are pulled into an internal buffer whenever the uart has
/// them, which is what `bytes_available` reports. Reads poll the uart until
/// data shows up or the read timeout runs out.
#[derive(Debug)]
pub struct BufferedSerial<S, D> {
    serial: S,
    delay: D,
    buf: VecDeque<u8>,
    timeout: Option<Duration>,
}

impl<S, D> BufferedSerial<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    pub fn new(serial: S, delay: D, timeout: Option<Duration>) -> BufferedSerial<S, D> {
        BufferedSerial {
            serial,
            delay,
            buf: VecDeque::new(),
            timeout,
        }
    }

    /// Load as much as we can from the uart into the internal buf.
    fn buffer(&mut self) -> Result<(), S::Error> {
        loop {
            match self.serial.read() {
                Ok(c) => self.buf.push_back(c),
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
    }

    /// Wait for at least one buffered byte. `false` means the timeout ran out.
    fn wait_for_data(&mut self) -> Result<bool, S::Error> {
        let limit = self.timeout.map(|t| t.as_micros());
        let mut waited: u128 = 0;
        self.buffer()?;
        while self.buf.is_empty() {
            if limit.is_some_and(|limit| waited >= limit) {
                return Ok(false);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            waited += POLL_INTERVAL_US as u128;
            self.buffer()?;
        }
        Ok(true)
    }

    pub fn release(self) -> (S, D) {
        (self.serial, self.delay)
    }
}

#[derive(Debug)]
pub struct ErrorShim<T: serial::Error>(pub T);

impl<T: serial::Error> embedded_io::Error for ErrorShim<T> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind::*;
        match self.0.kind() {
            Overrun => embedded_io::ErrorKind::OutOfMemory,
            FrameFormat => embedded_io::ErrorKind::InvalidData,
            Parity => embedded_io::ErrorKind::InvalidData,
            Noise => embedded_io::ErrorKind::Other,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl<T: serial::Error> From<T> for ErrorShim<T> {
    fn from(value: T) -> Self {
        ErrorShim(value)
    }
}

impl<S: ErrorType, D> embedded_io::ErrorType for BufferedSerial<S, D> {
    type Error = ErrorShim<S::Error>;
}

impl<S, D> embedded_io::Read for BufferedSerial<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.wait_for_data()? {
            return Ok(0);
        }
        let n = buf.len().min(self.buf.len());
        for (slot, c) in buf.iter_mut().zip(self.buf.drain(0..n)) {
            *slot = c;
        }
        Ok(n)
    }
}

impl<S, D> embedded_io::Write for BufferedSerial<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &word in buf {
            nb::block!(self.serial.write(word))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        nb::block!(self.serial.flush())?;
        Ok(())
    }
}

impl<S, D> Transport for BufferedSerial<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(self.buf.len())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error> {
        self.timeout = timeout;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;
    use core::convert::Infallible;

    use embedded_io::{Read as _, Write as _};

    use super::*;
    use crate::mock::NoDelay;

    /// Loopback uart: whatever is written can be read back, `rx` is what the
    /// far end sent.
    #[derive(Debug, Default)]
    struct Uart {
        tx: Vec<u8>,
        rx: VecDeque<u8>,
        flushed: usize,
    }

    impl ErrorType for Uart {
        type Error = Infallible;
    }

    impl Read for Uart {
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            self.rx.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl Write for Uart {
        fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
            self.tx.push(c);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            self.flushed += 1;
            Ok(())
        }
    }

    fn serial(rx: &[u8], timeout: Option<Duration>) -> BufferedSerial<Uart, NoDelay> {
        let uart = Uart {
            rx: rx.iter().copied().collect(),
            ..Uart::default()
        };
        BufferedSerial::new(uart, NoDelay::default(), timeout)
    }

    #[test]
    fn counts_pending_bytes() {
        let mut s = serial(&[1, 2, 3], Some(Duration::from_millis(10)));
        assert_eq!(s.bytes_available().unwrap(), 3);
        let mut buf = [0; 2];
        assert_eq!(s.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(s.bytes_available().unwrap(), 1);
    }

    #[test]
    fn read_times_out_with_zero_bytes() {
        let mut s = serial(&[], Some(Duration::from_millis(2)));
        let mut buf = [0; 4];
        assert_eq!(s.read(&mut buf).unwrap(), 0);
        let (_, delay) = s.release();
        assert_eq!(delay.total_ns, 2_000_000);
    }

    #[test]
    fn writes_every_word_and_flushes() {
        let mut s = serial(&[], None);
        s.write_all(&[0x00, 0x00, 0x02]).unwrap();
        s.flush().unwrap();
        let (uart, _) = s.release();
        assert_eq!(uart.tx, [0x00, 0x00, 0x02]);
        assert_eq!(uart.flushed, 1);
    }

    #[test]
    fn timeout_is_settable() {
        let mut s = serial(&[], Some(Duration::from_secs(1)));
        s.set_read_timeout(None).unwrap();
        assert_eq!(s.read_timeout(), None);
    }
}
