//! The dispatch loop.

use crate::buffer::{LineBuffer, Room, trim_line_end};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::HookRegistry;
use crate::observer::{Observer, TracingObserver, failure_summary};
use crate::pattern::{Captures, Found, Pattern};
use crate::queue::{Command, OnFailure, OnSuccess, Queue, State, Timing};
use crate::transport::Transport;
use std::io::{self, Write};
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Command/response engine over a line-oriented transport.
///
/// Nothing happens in the background: every state change occurs inside
/// [`poll`](Self::poll), or inside [`wait`](Self::wait), which calls `poll` in
/// a loop. A single command is in flight at a time.
///
/// ```
/// use chatter::{Command, Config, Engine, MockTransport, Timing};
///
/// let device = MockTransport::new();
/// let mut engine = Engine::new(Config::default());
/// engine.begin(device.clone(), None);
///
/// let command = Command::new("AT\r", "OK")?
///     .on_success(|_, _| println!("modem is alive"));
/// engine.execute(command, Timing::Any)?;
///
/// engine.poll();
/// assert_eq!(device.written(), b"AT\r");
/// device.feed(b"AT\r\nOK\r\n");
/// engine.poll();
/// assert_eq!(engine.queue_len(), 0);
/// # Ok::<(), chatter::Error>(())
/// ```
pub struct Engine<T, C = SystemClock> {
    transport: Option<T>,
    error_sink: Option<Box<dyn Write>>,
    observer: Box<dyn Observer>,
    clock: C,
    terminator: u8,
    buffer: LineBuffer,
    queue: Queue,
    hooks: HookRegistry,
    // Copy of the line being matched, so hooks see it unstripped.
    scratch: Vec<u8>,
    response: Vec<u8>,
}

impl<T: Transport> Engine<T, SystemClock> {
    /// Create an unbound engine using the wall clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<T: Transport, C: Clock> Engine<T, C> {
    /// Create an unbound engine reading time from `clock`.
    pub fn with_clock(config: Config, clock: C) -> Self {
        Self {
            transport: None,
            error_sink: None,
            observer: Box::new(TracingObserver),
            clock,
            terminator: config.terminator,
            buffer: LineBuffer::new(config.buffer_capacity, config.terminator),
            queue: Queue::new(&config),
            hooks: HookRegistry::new(config.hook_capacity, config.max_pattern_len),
            scratch: Vec::with_capacity(config.buffer_capacity),
            response: Vec::with_capacity(config.buffer_capacity),
        }
    }

    /// Bind the transport, and optionally a writer receiving failure summaries.
    ///
    /// Binding again replaces the previous transport; queued commands are kept.
    pub fn begin(&mut self, transport: T, error_sink: Option<Box<dyn Write>>) {
        self.transport = Some(transport);
        self.error_sink = error_sink;
    }

    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    /// Replace the default [`TracingObserver`].
    pub fn set_observer(&mut self, observer: impl Observer + 'static) {
        self.observer = Box::new(observer);
    }

    /// Enqueue `command`.
    pub fn execute(&mut self, command: Command, timing: Timing) -> Result<()> {
        if !self.is_bound() {
            return Err(Error::NotBound);
        }
        self.queue.push(command, timing)
    }

    /// Enqueue `steps` as a chain. See [`Queue::push_chain`].
    pub fn execute_chain(
        &mut self,
        steps: &[Command],
        timing: Timing,
        on_success: Option<OnSuccess>,
        on_failure: Option<OnFailure>,
    ) -> Result<()> {
        if !self.is_bound() {
            return Err(Error::NotBound);
        }
        self.queue.push_chain(steps, timing, on_success, on_failure)
    }

    /// Watch every completed line for `pattern`, independently of the queue.
    pub fn register_hook(
        &mut self,
        pattern: &str,
        on_match: impl Fn(&mut Queue, &Captures) + 'static,
    ) -> Result<()> {
        self.register_hook_pattern(Pattern::new(pattern)?, on_match)
    }

    /// [`register_hook`](Self::register_hook) with an already compiled pattern.
    pub fn register_hook_pattern(
        &mut self,
        pattern: Pattern,
        on_match: impl Fn(&mut Queue, &Captures) + 'static,
    ) -> Result<()> {
        self.hooks.register(pattern, on_match)
    }

    /// Run one tick of the state machine.
    ///
    /// Sends the front command once its delay is over, drains the transport
    /// line by line (matching the active command and running hooks), tries a
    /// prompt command against the unterminated tail, then checks the active
    /// command's timeout.
    pub fn poll(&mut self) {
        if !self.is_bound() {
            return;
        }
        let now = self.clock.now();
        self.advance(now);
        self.receive();
        self.match_latest_line();
        self.check_timeout(now);
    }

    /// Poll until the queue is empty or `timeout` elapses.
    ///
    /// Returns whether the queue drained.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        self.wait_with(timeout, || {})
    }

    /// Like [`wait`](Self::wait), calling `liveness` after every tick so an
    /// external watchdog can be fed during long waits.
    pub fn wait_with(&mut self, timeout: Duration, mut liveness: impl FnMut()) -> bool {
        if !self.is_bound() {
            return false;
        }
        let start = self.clock.now();
        loop {
            self.poll();
            if self.queue.is_empty() {
                return true;
            }
            if self.clock.now().saturating_duration_since(start) >= timeout {
                return false;
            }
            liveness();
        }
    }

    /// Drop the active command and the whole queue without running callbacks.
    pub fn abort(&mut self) -> bool {
        if !self.is_bound() {
            return false;
        }
        let dropped = self.queue.abort();
        debug!(dropped, "queue aborted");
        true
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// The most recently matched or received line.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Copy the most recent line into `out`, truncating to fit. Returns the
    /// number of bytes copied.
    pub fn latest_response(&self, out: &mut [u8]) -> usize {
        let len = self.response.len().min(out.len());
        out[..len].copy_from_slice(&self.response[..len]);
        len
    }

    /// Throw away all buffered input.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// IDLE -> PENDING_SEND -> AWAITING_MATCH.
    fn advance(&mut self, now: Instant) {
        if self.queue.state() == State::Idle && !self.queue.is_empty() {
            self.queue.set_state(State::PendingSend { since: now });
        }
        let State::PendingSend { since } = self.queue.state() else {
            return;
        };
        let Some(command) = self.queue.front() else {
            return;
        };
        if now.saturating_duration_since(since) < command.delay() {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let sent = transport
            .write_all(command.text())
            .and_then(|()| transport.flush());
        let expects_nothing = command.expectation().is_empty();
        match &sent {
            Ok(()) => self.observer.command_sent(command.text()),
            Err(err) => {
                warn!(%err, text = ?String::from_utf8_lossy(command.text()), "write failed")
            }
        }

        self.queue.set_state(State::AwaitingMatch { sent_at: now });
        // Lines that arrived before this point answer an earlier command.
        self.buffer.discard_observed();

        if let Err(err) = sent {
            self.fail(now, Some(&err));
        } else if expects_nothing {
            self.succeed(Captures::default());
        }
    }

    /// Drain the transport, handling each line as it completes.
    fn receive(&mut self) {
        loop {
            let Some(transport) = self.transport.as_mut() else {
                break;
            };
            if transport.available() == 0 {
                break;
            }
            let Some(byte) = transport.read_byte() else {
                break;
            };
            if self.buffer.is_full() {
                self.make_room();
            }
            if let Some(line) = self.buffer.push(byte) {
                self.line_completed(line);
            }
        }
    }

    fn make_room(&mut self) {
        match self.buffer.make_room() {
            Room::Compacted(dropped) => trace!(dropped, "compacted line buffer"),
            Room::Discarded(dropped) => self.emit_error(&format!(
                "line buffer overflow: discarded {dropped} bytes of an unterminated line"
            )),
        }
    }

    fn line_completed(&mut self, line: Range<usize>) {
        let content = trim_line_end(&self.buffer.as_bytes()[line.clone()], self.terminator);
        self.observer.line_received(content);
        if content.is_empty() {
            return;
        }
        self.response.clear();
        self.response.extend_from_slice(content);
        let content = line.start..line.start + content.len();

        if let Some(found) = self.find_active(content.clone()) {
            self.scratch.clear();
            self.scratch
                .extend_from_slice(&self.buffer.as_bytes()[content.clone()]);
            self.consume(content.start, found);
            self.hooks.dispatch(&self.scratch, &mut self.queue);
        } else {
            self.hooks
                .dispatch(&self.buffer.as_bytes()[content], &mut self.queue);
        }
    }

    /// Try a prompt command against the unterminated tail, since prompts never
    /// end their line. Other commands only match completed lines.
    fn match_latest_line(&mut self) {
        if !self.queue.front().is_some_and(Command::is_prompt) {
            return;
        }
        let start = self.buffer.cursor();
        let end = self.buffer.len();
        if start == end {
            return;
        }
        if let Some(found) = self.find_active(start..end) {
            self.response.clear();
            self.response
                .extend_from_slice(&self.buffer.as_bytes()[start..end]);
            self.consume(start, found);
        }
    }

    fn find_active(&self, range: Range<usize>) -> Option<Found> {
        if !self.queue.state().is_in_flight() {
            return None;
        }
        let command = self.queue.front()?;
        command.expectation().find(&self.buffer.as_bytes()[range])
    }

    /// Strip a match found at `offset` and resolve the active command.
    fn consume(&mut self, offset: usize, found: Found) {
        let span = self
            .buffer
            .span(offset + found.span.start..offset + found.span.end);
        self.buffer.strip(&span);
        self.succeed(found.captures);
    }

    fn check_timeout(&mut self, now: Instant) {
        let State::AwaitingMatch { sent_at } = self.queue.state() else {
            return;
        };
        let Some(command) = self.queue.front() else {
            return;
        };
        if now.saturating_duration_since(sent_at) > command.timeout() {
            self.fail(now, None);
        }
    }

    fn succeed(&mut self, captures: Captures) {
        let Some(command) = self.queue.dequeue_front() else {
            return;
        };
        debug!(text = ?String::from_utf8_lossy(command.text()), "command matched");
        if let (Some(on_success), _) = command.callbacks() {
            on_success(&mut self.queue, &captures);
        }
    }

    fn fail(&mut self, now: Instant, cause: Option<&io::Error>) {
        let sent_at = match self.queue.state() {
            State::AwaitingMatch { sent_at } => sent_at,
            _ => now,
        };
        let Some(command) = self.queue.dequeue_front() else {
            return;
        };
        let elapsed = now.saturating_duration_since(sent_at).as_millis();
        let mut summary = failure_summary(&command, elapsed);
        if let Some(err) = cause {
            summary.push_str(&format!(" ({err})"));
        }
        self.emit_error(&summary);
        // The command keeps its callbacks, so a retry can re-enqueue a clone.
        if let (_, Some(on_failure)) = command.callbacks() {
            on_failure(&mut self.queue, &command);
        }
    }

    fn emit_error(&mut self, message: &str) {
        self.observer.error_message(message);
        if let Some(sink) = self.error_sink.as_mut() {
            if let Err(err) = writeln!(sink, "{message}") {
                warn!(%err, "failed to write to error sink");
            }
        }
    }
}

/// The engine is itself a transport: reads and writes pass straight through to
/// the bound transport, so engines and logging layers can be stacked.
impl<T: Transport, C: Clock> Transport for Engine<T, C> {
    fn available(&mut self) -> usize {
        self.transport.as_mut().map_or(0, Transport::available)
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.transport.as_mut()?.read_byte()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.transport.as_mut()?.peek_byte()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.transport.as_mut() {
            Some(transport) => transport.write(data),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.flush(),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}
