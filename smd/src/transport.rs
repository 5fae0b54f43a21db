use std::io;
use std::time::Duration;

/// The byte stream the master talks over. The bus is half duplex, so the master never has more
/// than one request outstanding.
pub trait Transport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads until `count` bytes have arrived or the read timeout elapses, whichever comes first.
    /// A timeout is not an error: it just means fewer than `count` bytes come back.
    fn read_up_to(&mut self, count: usize) -> io::Result<Vec<u8>>;

    /// Discards anything received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;

    /// Discards anything written but not yet transmitted.
    fn clear_output(&mut self) -> io::Result<()>;

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read_up_to(&mut self, count: usize) -> io::Result<Vec<u8>> {
        (**self).read_up_to(count)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        (**self).clear_input()
    }

    fn clear_output(&mut self) -> io::Result<()> {
        (**self).clear_output()
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        (**self).set_baud_rate(baud_rate)
    }
}

#[cfg(feature = "serialport")]
mod serial {
    use super::Transport;
    use serialport::{ClearBuffer, SerialPort};
    use std::io::{self, ErrorKind, Read, Write};
    use std::time::{Duration, Instant};

    impl Transport for Box<dyn SerialPort> {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            Write::write_all(self, bytes)?;
            self.flush()
        }

        fn read_up_to(&mut self, count: usize) -> io::Result<Vec<u8>> {
            let deadline = Instant::now() + self.timeout();
            let mut buffer = vec![0; count];
            let mut filled = 0;
            while filled < count && Instant::now() < deadline {
                match self.read(&mut buffer[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }
            buffer.truncate(filled);
            Ok(buffer)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(self.clear(ClearBuffer::Input)?)
        }

        fn clear_output(&mut self) -> io::Result<()> {
            Ok(self.clear(ClearBuffer::Output)?)
        }

        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            Ok((**self).set_timeout(timeout)?)
        }

        fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
            Ok((**self).set_baud_rate(baud_rate)?)
        }
    }
}
