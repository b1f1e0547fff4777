//! Extension points the engine reports to, and failure reporting helpers.

use crate::queue::{Command, OnFailure, Queue};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Receives the engine's notable events.
///
/// All methods default to doing nothing; implement the ones you need and pass
/// the observer to [`Engine::set_observer`](crate::Engine::set_observer).
pub trait Observer {
    /// A complete line arrived, terminator and trailing `\r` removed.
    fn line_received(&mut self, _line: &[u8]) {}

    /// A command's text was written to the transport.
    fn command_sent(&mut self, _text: &[u8]) {}

    /// A human-readable diagnostic: timeouts, overflows, write errors.
    fn error_message(&mut self, _message: &str) {}
}

/// The default observer: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn line_received(&mut self, line: &[u8]) {
        trace!(line = %String::from_utf8_lossy(line), "line received");
    }

    fn command_sent(&mut self, text: &[u8]) {
        debug!(text = ?String::from_utf8_lossy(text), "command sent");
    }

    fn error_message(&mut self, message: &str) {
        warn!("{message}");
    }
}

/// One-line description of a failed command.
pub fn failure_summary(command: &Command, elapsed_ms: u128) -> String {
    format!(
        "command {:?} failed: no match for {:?} after {} ms",
        String::from_utf8_lossy(command.text()).trim_end(),
        command.expectation().as_str(),
        elapsed_ms
    )
}

/// A failure callback that writes a summary line to `sink`.
///
/// The elapsed time reported is the command's timeout.
pub fn print_failure<W: Write + 'static>(sink: Rc<RefCell<W>>) -> OnFailure {
    Rc::new(move |_: &mut Queue, command: &Command| {
        let summary = failure_summary(command, command.timeout().as_millis());
        let mut sink = sink.borrow_mut();
        if let Err(err) = writeln!(sink, "{summary}") {
            warn!(%err, "failed to write failure summary");
        }
    })
}
