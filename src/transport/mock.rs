use super::Transport;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Shared {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    fail_writes: bool,
}

/// In-memory transport for tests and simulations.
///
/// Clones share the same streams: hand one clone to the engine and keep
/// another to [`feed`](Self::feed) device output and inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Rc<RefCell<Shared>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the engine to read, as if the device had sent them.
    pub fn feed(&self, bytes: &[u8]) {
        self.shared.borrow_mut().inbound.extend(bytes);
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.shared.borrow().outbound.clone()
    }

    /// Everything written so far, clearing the record.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.shared.borrow_mut().outbound)
    }

    /// Bytes fed but not yet read.
    pub fn pending(&self) -> usize {
        self.shared.borrow().inbound.len()
    }

    /// Make every following write fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.borrow_mut().fail_writes = fail;
    }
}

impl Transport for MockTransport {
    fn available(&mut self) -> usize {
        self.pending()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.shared.borrow_mut().inbound.pop_front()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.shared.borrow().inbound.front().copied()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut shared = self.shared.borrow_mut();
        if shared.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        shared.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_and_read() {
        let handle = MockTransport::new();
        let mut transport = handle.clone();
        handle.feed(b"OK");
        assert_eq!(transport.available(), 2);
        assert_eq!(transport.read_byte(), Some(b'O'));
        assert_eq!(transport.read_byte(), Some(b'K'));
        assert_eq!(transport.read_byte(), None);
    }

    #[test]
    fn test_take_written_clears() {
        let handle = MockTransport::new();
        let mut transport = handle.clone();
        transport.write(b"AT\r").unwrap();
        assert_eq!(handle.take_written(), b"AT\r");
        assert!(handle.written().is_empty());
    }

    #[test]
    fn test_failing_writes() {
        let handle = MockTransport::new();
        let mut transport = handle.clone();
        handle.fail_writes(true);
        assert!(transport.write(b"AT").is_err());
    }
}
