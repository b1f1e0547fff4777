//! Runs parsed scripts against a bound engine.

use crate::command::{Context, Device, ScriptCommand};
use anyhow::{Context as _, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives a device through a list of script commands.
pub struct Runner {
    ctx: Context,
    final_wait: Duration,
}

impl Runner {
    /// Wrap a bound engine, echoing device output to stdout.
    pub fn new(engine: Device) -> Self {
        Self::with_handler(engine, |data| {
            let mut stdout = std::io::stdout();
            if let Err(err) = stdout.write_all(data).and_then(|()| stdout.flush()) {
                warn!(%err, "failed to write output");
            }
        })
    }

    /// Wrap a bound engine with a custom output handler.
    pub fn with_handler(engine: Device, output_handler: impl Fn(&[u8]) + 'static) -> Self {
        Self {
            ctx: Context::new(
                engine,
                output_handler,
                crate::queue::Command::DEFAULT_TIMEOUT,
            ),
            final_wait: Duration::from_secs(10),
        }
    }

    /// Timeout for `exec` and `chain` commands that do not name one.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.ctx.default_timeout = timeout;
        self
    }

    /// How long to wait for the queue to drain once the script is done.
    #[must_use]
    pub fn final_wait(mut self, timeout: Duration) -> Self {
        self.final_wait = timeout;
        self
    }

    /// Execute `commands` in order, then wait for the queue to drain.
    ///
    /// Stops at the first command that errors or the first queued command that
    /// fails to match.
    pub async fn execute(&mut self, commands: Vec<Box<dyn ScriptCommand>>) -> Result<()> {
        let total = commands.len();
        for (index, command) in commands.into_iter().enumerate() {
            debug!(index, name = command.name(), "executing");
            command
                .execute(&mut self.ctx)
                .await
                .with_context(|| format!("Command {} ({}) failed", index + 1, command.name()))?;
            if let Some(failure) = self.ctx.take_failure() {
                anyhow::bail!(failure);
            }
        }
        self.ctx
            .drain(self.final_wait)
            .await
            .context("Queue did not drain after the last command")?;
        info!(commands = total, "script complete");
        Ok(())
    }

    pub fn engine(&mut self) -> &mut Device {
        self.ctx.engine()
    }

    pub fn into_engine(self) -> Device {
        self.ctx.into_engine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::Engine;
    use crate::parser::parse_str;
    use crate::transport::MockTransport;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn runner() -> (Runner, MockTransport, Rc<RefCell<Vec<u8>>>) {
        let device = MockTransport::new();
        let mut engine: Device = Engine::new(Config::default());
        engine.begin(Box::new(device.clone()), None);
        let output = Rc::new(RefCell::new(Vec::new()));
        let sink = output.clone();
        let runner = Runner::with_handler(engine, move |data| {
            sink.borrow_mut().extend_from_slice(data)
        })
        .default_timeout(Duration::from_millis(50))
        .final_wait(Duration::from_millis(500));
        (runner, device, output)
    }

    #[tokio::test]
    async fn test_runs_script_to_completion() {
        let (mut runner, device, output) = runner();
        let commands = parse_str(
            r#"
show "start"
send "ATZ\r"
exec "ATE0\r" ""
"#,
        )
        .unwrap();
        runner.execute(commands).await.unwrap();
        assert_eq!(device.written(), b"ATZ\rATE0\r");
        assert_eq!(output.borrow().as_slice(), b"start\n");
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let (mut runner, device, _) = runner();
        let commands = parse_str(
            r#"
exec "AT\r" "OK"
wait 1s
show "unreachable"
"#,
        )
        .unwrap();
        let err = runner.execute(commands).await.unwrap_err();
        assert!(format!("{err:#}").contains("no match for \"OK\""), "got: {err:#}");
        assert_eq!(device.written(), b"AT\r");
    }

    #[tokio::test]
    async fn test_pending_commands_drain_at_end() {
        let (mut runner, device, _) = runner();
        device.feed(b"OK\r\n");
        let commands = parse_str(r#"exec "AT\r" "OK" 1s"#).unwrap();
        runner.execute(commands).await.unwrap();
        assert_eq!(runner.engine().queue_len(), 0);
    }
}
