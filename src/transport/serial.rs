use super::Transport;
use super::reader::Inbox;
use anyhow::{Context, Result};
use serialport::SerialPort;
use std::io::{self, Write};
use std::time::Duration;

/// A serial port opened with 8N1 framing and no flow control.
pub struct SerialTransport {
    name: String,
    port: Box<dyn SerialPort>,
    inbox: Inbox,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .with_context(|| format!("Failed to open serial port {path}"))?;
        let reader = port
            .try_clone()
            .with_context(|| format!("Failed to clone serial port {path}"))?;
        Ok(Self {
            name: path.to_string(),
            port,
            inbox: Inbox::spawn(reader),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn available(&mut self) -> usize {
        self.inbox.available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.inbox.read_byte()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.inbox.peek_byte()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.port, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }
}
