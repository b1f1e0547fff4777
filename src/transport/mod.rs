//! The byte stream the engine talks through.

mod mock;
mod pty;
mod reader;
mod serial;

pub use mock::MockTransport;
pub use pty::PtyTransport;
pub use serial::SerialTransport;

use std::io;

/// A non-blocking duplex byte stream.
///
/// Reads never block: `available` reports what can be read right now and
/// `read_byte` returns `None` when nothing is pending.
pub trait Transport {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Take the next byte.
    fn read_byte(&mut self) -> Option<u8>;

    /// Look at the next byte without taking it.
    fn peek_byte(&mut self) -> Option<u8>;

    /// Write some of `data`, returning how much was accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;

    /// Write all of `data`.
    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => data = &data[n..],
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        (**self).peek_byte()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }
}
