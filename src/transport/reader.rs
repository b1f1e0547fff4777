use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::thread;
use tracing::debug;

/// Non-blocking view over a blocking reader.
///
/// A background thread reads chunks and sends them over a channel; the inbox
/// collects them on demand so `available`/`read`/`peek` never block.
pub(crate) struct Inbox {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    stop: Arc<AtomicBool>,
}

impl Inbox {
    /// Spawns a background thread reading from `reader`.
    ///
    /// Read timeouts are retried, so readers configured with a timeout (serial
    /// ports) notice when the inbox is dropped.
    pub fn spawn<R: Read + Send + 'static>(mut reader: R) -> Self {
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = stop.clone();

        thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            while !stopped.load(Ordering::Relaxed) {
                match reader.read(&mut buffer) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break; // Inbox dropped
                        }
                    }
                    Err(err)
                        if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                    Err(err) => {
                        debug!(%err, "reader stopped");
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            pending: VecDeque::new(),
            stop,
        }
    }

    fn collect(&mut self) {
        while let Ok(chunk) = self.rx.try_recv() {
            self.pending.extend(chunk);
        }
    }

    pub fn available(&mut self) -> usize {
        self.collect();
        self.pending.len()
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.collect();
        }
        self.pending.pop_front()
    }

    pub fn peek_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.collect();
        }
        self.pending.front().copied()
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
