use super::Transport;
use super::reader::Inbox;
use anyhow::{Context, Result};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use std::io::{self, Write};

/// A program running behind a pseudo-terminal, used as a line device.
///
/// Handy for modem simulators, firmware consoles exposed by an emulator, or a
/// terminal program (`picocom`, `socat`) bridging to real hardware.
pub struct PtyTransport {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    inbox: Inbox,
}

impl PtyTransport {
    /// Spawn `command` with `args` inside a new PTY.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        let pty_system = portable_pty::native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(command);
        for arg in args {
            cmd.arg(arg);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {command}"))?;

        let writer = pair
            .master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;

        Ok(Self {
            master: pair.master,
            child,
            writer,
            inbox: Inbox::spawn(reader),
        })
    }

    /// Check if the child process is still running
    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// Resize the PTY
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        self.master.resize(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })?;
        Ok(())
    }
}

impl Transport for PtyTransport {
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
        Write::write(&mut self.writer, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.writer)
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.child.kill();
        }
    }
}
