//! [`Exec`] command: queues a command and the pattern its response must match.
//!
//! Script syntax:
//! - `exec "AT\r" "OK"`: default timeout, queued behind everything else
//! - `exec "AT+CSQ\r" "\+CSQ: (\d+)" 5s`: custom timeout
//! - `exec "AT\r" "OK" 1s 200ms next`: custom delay, jumps the queue
//! - `exec "AT+CMGS=1\r" "> " prompt`: the response never ends its line

use crate::command::{Context, ScriptCommand};
use crate::parser::{Arg, parse_duration, split_args};
use crate::pattern::Pattern;
use crate::queue::{Command, Timing};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;

/// Queues `text` to be sent once the engine is free.
///
/// Execution returns as soon as the command is queued; the response is matched
/// while later commands run. A failed match stops the script.
pub struct Exec {
    pub text: String,
    pub pattern: Pattern,
    pub timeout: Option<Duration>,
    pub delay: Duration,
    pub timing: Timing,
    pub prompt: bool,
}

impl Exec {
    pub const NAME: &'static str = "exec";

    pub fn new(text: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            text: text.into(),
            pattern: Pattern::new(pattern)?,
            timeout: None,
            delay: Duration::ZERO,
            timing: Timing::Any,
            prompt: false,
        })
    }
}

/// Trailing `[timeout] [delay] [next] [prompt]` options.
#[derive(Debug, Default)]
pub(crate) struct Options {
    pub timeout: Option<Duration>,
    pub delay: Duration,
    pub timing: Timing,
    pub prompt: bool,
}

impl Options {
    pub(crate) fn parse(rest: &[Arg]) -> Result<Self> {
        let mut options = Self::default();
        let mut durations = Vec::new();
        for arg in rest {
            match arg {
                Arg::Bare(word) if word == "next" => options.timing = Timing::Next,
                Arg::Bare(word) if word == "prompt" => options.prompt = true,
                Arg::Bare(word) => durations.push(parse_duration(word)?),
                Arg::Quoted(s) => return Err(anyhow!("Unexpected string argument: {:?}", s)),
            }
        }
        match durations[..] {
            [] => {}
            [timeout] => options.timeout = Some(timeout),
            [timeout, delay] => {
                options.timeout = Some(timeout);
                options.delay = delay;
            }
            _ => return Err(anyhow!("Too many durations: expected [timeout] [delay]")),
        }
        Ok(options)
    }
}

#[async_trait(?Send)]
impl ScriptCommand for Exec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let args = split_args(args)?;
        let (text, pattern, rest) = match args.as_slice() {
            [Arg::Quoted(text), Arg::Quoted(pattern), rest @ ..] => (text, pattern, rest),
            _ => return Err(anyhow!("Expected quoted command and pattern after 'exec'")),
        };
        let options = Options::parse(rest)?;
        Ok(Self {
            timeout: options.timeout,
            delay: options.delay,
            timing: options.timing,
            prompt: options.prompt,
            ..Self::new(text.clone(), pattern)?
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let command = Command::with_pattern(self.text.as_bytes(), self.pattern.clone())
            .with_timeout(self.timeout.unwrap_or(ctx.default_timeout()))
            .with_delay(self.delay)
            .with_prompt(self.prompt)
            .with_failure(Some(ctx.record_failure()));
        ctx.make_room().await?;
        ctx.engine().execute(command, self.timing)?;
        Ok(())
    }
}
