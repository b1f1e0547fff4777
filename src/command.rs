//! The [`ScriptCommand`] trait and the [`Context`] type commands receive when executed.

use crate::engine::Engine;
use crate::observer::{Observer, TracingObserver, failure_summary};
use crate::queue::{Command, OnFailure, Queue};
use crate::transport::Transport;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// The engine type scripts drive: any transport, wall clock.
pub type Device = Engine<Box<dyn Transport>>;

pub(crate) type OutputHandler = Rc<dyn Fn(&[u8])>;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Execution context passed to [`ScriptCommand::execute`].
///
/// Owns the engine, the output handler and the list of command failures
/// recorded by callbacks since the last check.
pub struct Context {
    pub(crate) engine: Device,
    pub(crate) output_handler: OutputHandler,
    pub(crate) failures: Rc<RefCell<Vec<String>>>,
    pub(crate) default_timeout: Duration,
}

impl Context {
    /// Wrap a bound engine. Every received line is echoed to `output_handler`.
    pub fn new(
        mut engine: Device,
        output_handler: impl Fn(&[u8]) + 'static,
        default_timeout: Duration,
    ) -> Self {
        let output_handler: OutputHandler = Rc::new(output_handler);
        engine.set_observer(Echo {
            output_handler: output_handler.clone(),
        });
        Self {
            engine,
            output_handler,
            failures: Rc::new(RefCell::new(Vec::new())),
            default_timeout,
        }
    }

    pub fn engine(&mut self) -> &mut Device {
        &mut self.engine
    }

    pub fn into_engine(self) -> Device {
        self.engine
    }

    /// Pass bytes through the output handler (e.g. to stdout or a custom sink).
    pub fn emit(&self, data: &[u8]) {
        (self.output_handler)(data);
    }

    /// A clone of the output handler, for callbacks that outlive the borrow.
    pub(crate) fn output_handler(&self) -> OutputHandler {
        self.output_handler.clone()
    }

    /// Timeout used by commands that do not name one.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// A failure callback that records the command for [`take_failure`](Self::take_failure).
    pub fn record_failure(&self) -> OnFailure {
        let failures = self.failures.clone();
        Rc::new(move |_: &mut Queue, command: &Command| {
            let summary = failure_summary(command, command.timeout().as_millis());
            failures.borrow_mut().push(summary);
        })
    }

    /// The oldest failure recorded since the last call, if any.
    pub fn take_failure(&self) -> Option<String> {
        let mut failures = self.failures.borrow_mut();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    }

    fn check_failures(&self) -> Result<()> {
        match self.take_failure() {
            Some(failure) => Err(anyhow!(failure)),
            None => Ok(()),
        }
    }

    /// Poll the engine until the queue is empty, or until `timeout` elapses.
    ///
    /// Fails as soon as a command fails.
    pub async fn drain(&mut self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            self.engine.poll();
            self.check_failures()?;
            if self.engine.queue_len() == 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(anyhow!(
                    "Timeout waiting for {} queued command(s)",
                    self.engine.queue_len()
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll the engine until a queue slot is free.
    pub async fn make_room(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.default_timeout;
        while self.engine.queue().is_full() {
            self.engine.poll();
            self.check_failures()?;
            if tokio::time::Instant::now() >= deadline {
                return Err(anyhow!("Timeout waiting for a free queue slot"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// Keep polling the engine for `duration`.
    pub async fn drive_for(&mut self, duration: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            self.engine.poll();
            self.check_failures()?;
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Echoes received lines to the output handler, logging the rest.
struct Echo {
    output_handler: OutputHandler,
}

impl Observer for Echo {
    fn line_received(&mut self, line: &[u8]) {
        TracingObserver.line_received(line);
        let mut echoed = Vec::with_capacity(line.len() + 1);
        echoed.extend_from_slice(line);
        echoed.push(b'\n');
        (self.output_handler)(&echoed);
    }

    fn command_sent(&mut self, text: &[u8]) {
        TracingObserver.command_sent(text);
    }

    fn error_message(&mut self, message: &str) {
        TracingObserver.error_message(message);
    }
}

/// A single chatter script command.
///
/// Implement this trait to add a new command to the runner. Then:
///
/// 1. Define `pub const NAME: &'static str` on your struct, the script
///    keyword (e.g. `"exec"`, `"wait"`) used by the parser.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
#[async_trait(?Send)]
pub trait ScriptCommand: 'static {
    /// The command name, accessible at runtime through a trait object.
    ///
    /// Implementations should return their `NAME` constant:
    /// `fn name(&self) -> &'static str { Self::NAME }`.
    fn name(&self) -> &'static str;

    /// Parse this command from the argument string (everything after the
    /// command keyword on the script line).
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command. Used as the function-pointer type stored in
    /// the command registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn ScriptCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    /// Execute the command using the provided context.
    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::MockTransport;

    /// A context over a mock device, capturing everything emitted.
    pub(crate) fn context() -> (Context, MockTransport, Rc<RefCell<Vec<u8>>>) {
        let device = MockTransport::new();
        let mut engine: Device = Engine::new(Config::default());
        engine.begin(Box::new(device.clone()), None);
        let output = Rc::new(RefCell::new(Vec::new()));
        let sink = output.clone();
        let ctx = Context::new(
            engine,
            move |data| sink.borrow_mut().extend_from_slice(data),
            Duration::from_millis(200),
        );
        (ctx, device, output)
    }

    #[test]
    fn test_received_lines_are_echoed() {
        let (mut ctx, device, output) = context();
        device.feed(b"RING\r\n");
        ctx.engine().poll();
        assert_eq!(output.borrow().as_slice(), b"RING\n");
    }

    #[test]
    fn test_record_failure() {
        let (ctx, _, _) = context();
        let on_failure = ctx.record_failure();
        let command = Command::new("AT\r", "OK").unwrap();
        let mut queue = Queue::new(&Config::default());
        on_failure(&mut queue, &command);
        let failure = ctx.take_failure().unwrap();
        assert!(failure.contains("\"AT\""), "got: {failure}");
        assert!(ctx.take_failure().is_none());
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let (mut ctx, _, _) = context();
        ctx.drain(Duration::from_millis(50)).await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let (mut ctx, _, _) = context();
        let command = Command::new("AT\r", "OK")
            .unwrap()
            .with_timeout(Duration::from_secs(10));
        ctx.engine().execute(command, crate::queue::Timing::Any).unwrap();
        let err = ctx.drain(Duration::from_millis(30)).await.unwrap_err();
        assert!(err.to_string().contains("Timeout"), "got: {err}");
    }
}
